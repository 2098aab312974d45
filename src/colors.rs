//! Color policy for status messages.
//!
//! Honors `NO_COLOR` (https://no-color.org/), `CLICOLOR=0` and
//! `CLICOLOR_FORCE`. Without any of those, colors follow whether stderr, where
//! status lines go, is a terminal.
use colored::control;
use std::io::IsTerminal;

/// Decide whether to color output from the environment and TTY state.
pub fn colors_enabled<F>(lookup: F, is_tty: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    // NO_COLOR beats everything, including CLICOLOR_FORCE
    if lookup("NO_COLOR").is_some() {
        return false;
    }
    if lookup("CLICOLOR_FORCE").is_some_and(|v| v != "0") {
        return true;
    }
    if lookup("CLICOLOR").is_some_and(|v| v == "0") {
        return false;
    }
    is_tty
}

/// Apply the color policy globally. Call early in `main`.
pub fn init_colors() {
    let enabled = colors_enabled(
        |key| std::env::var(key).ok(),
        std::io::stderr().is_terminal(),
    );
    control::set_override(enabled);
}
