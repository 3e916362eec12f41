//! Reference implementation of the commitment-line extractor the MemeGraph
//! depends on to bind `commitment_open` events back to the assistant message
//! that issued them. Pure, prefix-based, no heuristics.

/// Returns the trimmed remainder of every `COMMIT:`-prefixed line in `content`.
pub fn extract_commitments(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.strip_prefix("COMMIT:"))
        .map(|rest| rest.trim().to_string())
        .collect()
}
