//! Header normalization for tolerant matching.

/// Normalize a header for comparison: lowercase, separators to spaces,
/// whitespace collapsed.
///
/// "Payee ABN", "payee_abn" and " PAYEE-ABN " all normalize identically.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', '-', '.', '/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
