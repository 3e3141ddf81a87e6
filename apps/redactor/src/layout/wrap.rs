//! Greedy word-wrap against an arbitrary width function.
//!
//! Words are whitespace-separated and never split. A word wider than
//! `max_width` on its own becomes an overflow line.

/// Wraps `text` into lines whose measured width is at most `max_width`.
///
/// `width_fn` measures a candidate line at the target size and typeface.
/// Empty or whitespace-only input yields no lines.
pub fn wrap_text<F>(text: &str, max_width: f32, width_fn: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return Vec::new();
    };

    let mut lines: Vec<String> = Vec::new();
    let mut current = first.to_string();

    for word in words {
        let candidate = format!("{current} {word}");
        if width_fn(&candidate) <= max_width {
            current = candidate;
        } else {
            // Current line is full: commit it and start a new line.
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    // Push the final (possibly partial) line.
    lines.push(current);
    lines
}
