//! Shared head/tail truncation helpers.
//!
//! Every sandbox tool, the Worker's stdout feedback, and the bindings digest
//! truncate long text the same way: preserve the head, elide the middle (or
//! tail), and name the number of omitted bytes. Centralizing it here means
//! the "truncation style everywhere" contract is enforced by construction
//! rather than by several independent implementations drifting apart.

/// Find the nearest char boundary at or before `idx`. A stable polyfill for
/// `str::floor_char_boundary`.
fn floor_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut boundary = idx;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

/// Truncate `text` to at most `limit` bytes, keeping only the head and
/// appending a marker naming the full original byte length. Used for short
/// previews (bindings digest values) where only the head matters.
pub fn truncate_head(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let boundary = floor_char_boundary(text, limit);
    format!(
        "{}... [truncated, {} bytes total]",
        &text[..boundary],
        text.len()
    )
}

/// Truncate `text` to at most `limit` bytes, preserving both head and tail
/// and eliding the middle. Used for tool output and stdout capture where
/// the end of the output (e.g. an error at the bottom of a log) matters as
/// much as the start.
///
/// Returns the text unchanged if it already fits.
pub fn truncate_head_tail(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let half = limit / 2;
    let head_end = floor_char_boundary(text, half);
    let tail_start_target = text.len().saturating_sub(half);
    let mut tail_start = tail_start_target;
    while tail_start < text.len() && !text.is_char_boundary(tail_start) {
        tail_start += 1;
    }
    let omitted = tail_start.saturating_sub(head_end);
    format!(
        "{}\n... [truncated, {} bytes omitted, {} bytes total] ...\n{}",
        &text[..head_end],
        omitted,
        text.len(),
        &text[tail_start..]
    )
}

/// Cap a count of items (matches, paths) at `limit`, returning the kept
/// slice and whether the total was truncated.
pub fn cap_count<T>(items: Vec<T>, limit: usize) -> (Vec<T>, bool) {
    let total = items.len();
    if total <= limit {
        (items, false)
    } else {
        let mut items = items;
        items.truncate(limit);
        (items, true)
    }
}
