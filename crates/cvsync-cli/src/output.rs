//! Terminal and JSON output.

use console::style;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

static JSON_OUTPUT: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

/// Enable JSON output mode.
pub fn enable_json() {
    JSON_OUTPUT.store(true, Ordering::Relaxed);
}

/// Check if JSON output is enabled.
pub fn is_json() -> bool {
    JSON_OUTPUT.load(Ordering::Relaxed)
}

/// Suppress informational text output.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

fn quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print a styled header
pub fn header(text: &str) {
    if !quiet() && !is_json() {
        println!("{} {}", style("cvsync").cyan().bold(), style(text).dim());
    }
}

/// Print a success message
pub fn success(text: &str) {
    if !quiet() && !is_json() {
        println!("{} {text}", style("✓").green());
    }
}

/// Print an informational line
pub fn info(text: &str) {
    if !quiet() && !is_json() {
        println!("  {text}");
    }
}

/// Print a warning message
pub fn warning(text: &str) {
    if !is_json() {
        eprintln!("{} {}", style("!").yellow(), style(text).yellow());
    }
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", sonic_rs::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct JsonError {
    success: bool,
    error: String,
    causes: Vec<String>,
}

/// Print an error with its cause chain.
pub fn print_error(err: &anyhow::Error) {
    let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
    if is_json() {
        let body = JsonError {
            success: false,
            error: err.to_string(),
            causes,
        };
        match sonic_rs::to_string_pretty(&body) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("error: {err}"),
        }
        return;
    }

    eprintln!("{} {err}", style("error:").red().bold());
    for cause in causes {
        eprintln!("  {} {cause}", style("caused by:").dim());
    }
}
