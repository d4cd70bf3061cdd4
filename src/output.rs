//! Colored console output for the operator.

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const RESET: &str = "\x1b[0m";

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{GREEN}{msg}{RESET}");
}

/// Print a warning message.
pub fn print_warn(msg: &str) {
    println!("{YELLOW}{msg}{RESET}");
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{RED}{msg}{RESET}");
}

/// Print a ` - key: value` line of the configuration banner.
pub fn print_kv(key: &str, value: &str) {
    println!(" - {CYAN}{key}:{RESET} {value}");
}

/// Prompt user for confirmation. Returns true if confirmed.
pub fn confirm(prompt: &str) -> bool {
    use std::io::{self, Write};
    print!("{CYAN}{prompt} (y/n) : {RESET}");
    io::stdout().flush().ok();
    let mut input = String::new();
    io::stdin().read_line(&mut input).ok();
    is_yes(&input)
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
