//! Line-oriented record splitting.

/// Splits `text` into contiguous runs of non-blank lines. A line containing
/// only whitespace counts as blank. Runs of blank lines collapse; empty input
/// yields no records.
pub fn split_by_empty_line(text: &str) -> Vec<Vec<&str>> {
    let mut parts = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
