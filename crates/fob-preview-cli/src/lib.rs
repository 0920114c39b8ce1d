//! Command-line interface for the component preview builder.
//!
//! `fob-preview build` writes a static preview to the output directory.
//! `fob-preview dev` serves the preview and rebuilds it when sources change.
//! Both load `fob-preview.toml` (or `.json`) from the working directory and
//! apply command-line overrides on top.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod server;
pub mod ui;

pub use error::{CliError, Result};
