//! Command implementations.
//!
//! - [`build`] - One-shot static build
//! - [`dev`] - Development server

pub mod build;
pub mod dev;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
