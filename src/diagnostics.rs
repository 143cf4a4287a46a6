//! Minimal ANSI color helpers for the CLI binary's stderr diagnostics.
//! Honors `NO_COLOR` and a dumb `TERM` the way a real terminal session would.

use std::env;

pub const RED: &str = "\x1b[31m";
pub const YELLOW: &str = "\x1b[33m";
pub const GREEN: &str = "\x1b[32m";
pub const DIM: &str = "\x1b[2m";
pub const RESET: &str = "\x1b[0m";

pub fn ansi_enabled() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    match env::var("TERM") {
        Ok(term) => term != "dumb" && !term.is_empty(),
        Err(_) => false,
    }
}

pub fn colorize(text: &str, color: &str) -> String {
    if ansi_enabled() {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}
