// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal styling.
//!
//! Respects NO_COLOR and FORCE_COLOR.

use colored::{ColoredString, Colorize};

/// Decide color support from the environment. Call once at startup.
pub fn init() {
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    } else if std::env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn file_path(path: &str) -> ColoredString {
    path.underline()
}

pub fn count(n: usize, noun: &str) -> ColoredString {
    let plural = if n == 1 { "" } else { "s" };
    format!("{n} {noun}{plural}").bold()
}
