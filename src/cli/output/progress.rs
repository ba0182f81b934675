//! Spinner for streamed runs using indicatif.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

/// A spinner on stderr, or a hidden bar when stderr is not a terminal.
///
/// Lines printed through a hidden bar are dropped, so callers check
/// [`ProgressBar::is_hidden`] and fall back to `eprintln!`.
pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    if !console::Term::stderr().features().is_attended() {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        spinner.set_style(style.tick_chars(SPINNER_CHARS));
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print a line above the spinner, or straight to stderr when hidden.
pub fn print_line(spinner: &ProgressBar, line: &str) {
    if spinner.is_hidden() {
        eprintln!("{line}");
    } else {
        spinner.println(line);
    }
}
