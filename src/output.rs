//! # Output Styling
//!
//! Controls whether status lines are colorized. The global `--plain` flag
//! forces plain output; otherwise color support is detected from the
//! environment (`NO_COLOR` per https://no-color.org/, `TERM=dumb`, and the
//! terminal's own capabilities).

use std::env;
use std::fmt::Display;

use console::style;

/// Whether styled output is in effect for this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Color,
    Plain,
}

impl LogMode {
    /// Derive the mode from the global `--plain` flag and the environment.
    pub fn from_plain_flag(plain: bool) -> Self {
        if plain || !detect_color_support() {
            LogMode::Plain
        } else {
            LogMode::Color
        }
    }

    pub fn is_color(self) -> bool {
        self == LogMode::Color
    }
}

fn detect_color_support() -> bool {
    // The presence of NO_COLOR (even empty) disables colors.
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if env::var("TERM").is_ok_and(|v| v == "dumb") {
        return false;
    }
    console::Term::stdout().features().colors_supported()
}

/// Print a section header line.
pub fn header(mode: LogMode, message: impl Display) {
    if mode.is_color() {
        println!("{}", style(message).cyan().bold());
    } else {
        println!("{message}");
    }
}

/// Print a success line.
pub fn success(mode: LogMode, message: impl Display) {
    if mode.is_color() {
        println!("{}", style(message).green());
    } else {
        println!("{message}");
    }
}

/// Print an informational line.
pub fn info(_mode: LogMode, message: impl Display) {
    println!("{message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_flag_forces_plain() {
        assert_eq!(LogMode::from_plain_flag(true), LogMode::Plain);
    }

    #[test]
    fn test_is_color() {
        assert!(LogMode::Color.is_color());
        assert!(!LogMode::Plain.is_color());
    }
}
