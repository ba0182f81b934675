//! Terminal output: tables, spinners and status styling.

pub mod progress;
pub mod style;
pub mod table;

/// Truncate a string to at most `max_len` characters, appending "..." if cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
