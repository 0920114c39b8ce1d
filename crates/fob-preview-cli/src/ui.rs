//! Terminal output helpers. Everything goes to stderr; stdout is reserved
//! for `--json` summaries.

use std::sync::atomic::{AtomicBool, Ordering};

use console::Term;
use fob_preview_builder::BuildMetadata;
use owo_colors::OwoColorize;

static COLOR: AtomicBool = AtomicBool::new(true);

/// Respects `--no-color`, `NO_COLOR` and `FORCE_COLOR`, then terminal detection.
pub fn init_colors(no_color: bool) {
    COLOR.store(should_use_color(no_color), Ordering::Relaxed);
}

pub fn should_use_color(no_color: bool) -> bool {
    if no_color || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

fn colored() -> bool {
    COLOR.load(Ordering::Relaxed)
}

pub fn success(message: &str) {
    if colored() {
        eprintln!("{} {}", "✓".green().bold(), message);
    } else {
        eprintln!("✓ {}", message);
    }
}

pub fn info(message: &str) {
    if colored() {
        eprintln!("{} {}", "ℹ".blue().bold(), message);
    } else {
        eprintln!("ℹ {}", message);
    }
}

pub fn warning(message: &str) {
    if colored() {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    } else {
        eprintln!("⚠ {}", message);
    }
}

pub fn error(message: &str) {
    if colored() {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    } else {
        eprintln!("✗ {}", message);
    }
}

/// Human readable size, e.g. `"1.50 KB"`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

/// Table of emitted files, entries first.
pub fn print_build_summary(metadata: &BuildMetadata) {
    let width = (Term::stderr().size().1 as usize).min(80);
    let mut outputs: Vec<_> = metadata.outputs.iter().collect();
    outputs.sort_by(|a, b| b.is_entry.cmp(&a.is_entry).then_with(|| a.file.cmp(&b.file)));

    eprintln!();
    eprintln!("{}", "─".repeat(width));
    for output in outputs {
        let size = format_size(output.bytes);
        if colored() {
            eprintln!("  {} {} {}", "▸".blue(), output.file.bright_white().bold(), size.dimmed());
        } else {
            eprintln!("  ▸ {} {}", output.file, size);
        }
    }
    eprintln!("{}", "─".repeat(width));
    eprintln!(
        "  {} files, {} from {} inputs",
        metadata.outputs.len(),
        format_size(metadata.total_bytes()),
        metadata.inputs
    );
}
