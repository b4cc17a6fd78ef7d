//! CLI output formatting utilities.

use crate::transcript::{format_timestamp, Segment};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one transcript segment, highlighting the spoken word if any.
    pub fn segment(index: usize, segment: &Segment, active_word: Option<usize>) {
        let text = match active_word {
            Some(word) if !segment.words().is_empty() => segment
                .words()
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    if i == word {
                        style(w.text.as_str()).yellow().bold().to_string()
                    } else {
                        w.text.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
            _ => segment.display_text().to_string(),
        };

        println!(
            "{} {} {} {}",
            style(format!("#{:<4}", index)).dim(),
            style(format_timestamp(segment.start)).cyan(),
            style(format!("{}:", segment.speaker_or_default())).green(),
            text
        );
    }

    /// Erase the previous line so a segment can be redrawn in place.
    pub fn clear_last_line() {
        let term = console::Term::stdout();
        if term.is_term() {
            let _ = term.clear_last_lines(1);
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Truncate content with ellipsis, on a character boundary.
pub fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42.0), "42s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
    }

    #[test]
    fn test_content_preview_multibyte() {
        assert_eq!(content_preview("Grüße aus Köln", 5), "Grüße...");
        assert_eq!(content_preview("kurz", 10), "kurz");
    }
}
