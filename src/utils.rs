use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

/// Truncates a given string to a specified maximum width, appending an ellipsis (`…`)
/// if the string exceeds the specified width. Handles Unicode grapheme clusters properly.
///
/// # Panics
/// Panics if `max_width` is less than 2.
///
/// # Examples
/// ```rust
/// use pagescore::utils::truncate_message;
///
/// let truncated = truncate_message("https://example.com/a/long/path", 12);
/// assert_eq!(truncated, "https://exa…");
///
/// assert_eq!(truncate_message("Hi", 5), "Hi");
/// ```
pub fn truncate_message(message: &str, max_width: usize) -> String {
    assert!(
        max_width >= 2,
        "max_width must be at least 2 to accommodate the ellipsis"
    );

    let graphemes: Vec<&str> = message.graphemes(true).collect();

    if graphemes.len() > max_width {
        // Truncate to max_width - 1 to leave space for ellipsis
        let truncated: String = graphemes[..max_width - 1].concat();
        format!("{}…", truncated)
    } else {
        message.to_string()
    }
}

/// Expands a leading `~` and `$VAR`s in a user supplied path.
///
/// Undefined variables are left as written.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// Reads one URL per line. Surrounding whitespace is trimmed, blank lines
/// and `#` comments are skipped; everything else is handed to the validator.
pub fn read_url_file(path: &Path) -> io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

pub fn score(value: f64) -> String {
    format!("{value:.0}")
}

pub fn ms(duration: Duration) -> String {
    let milliseconds = duration.as_secs_f64() * 1000.0;
    format!("{milliseconds:.2}ms")
}
