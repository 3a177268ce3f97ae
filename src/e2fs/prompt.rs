//! Operator prompting.

use std::io::BufRead;
use std::io::Write;
use std::{fmt, io};

/// Shows a prompt and returns the next input line, or `None` on EOF.
pub fn prompt<P: fmt::Display>(text: P) -> Option<String> {
    print!("{text}");
    let _ = io::stdout().flush();
    io::stdin().lock().lines().next().map(|l| l.unwrap_or_default())
}

/// Asks a yes/no question; anything but `y` declines.
pub fn confirm<P: fmt::Display>(text: P) -> bool {
    prompt(text)
        .map(|s| s.trim().eq_ignore_ascii_case("y"))
        .unwrap_or(false)
}
