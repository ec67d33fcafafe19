//! Australian Business Number normalization.
//!
//! Identifiers arrive in whatever shape the tenant's source system exports
//! ("51 824 753 556", "ABN: 51824753556", ...). Everything downstream
//! compares normalized forms only.

/// Strip every non-digit character from an identifier.
pub fn normalize_abn(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Basic well-formed check: an ABN is exactly eleven digits.
///
/// This is a shape check, not a registry lookup; an eleven-digit identifier
/// can still fail to match any classification result.
pub fn is_well_formed_abn(normalized: &str) -> bool {
    normalized.len() == 11 && normalized.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_spaces_and_labels() {
        assert_eq!(normalize_abn("51 824 753 556"), "51824753556");
        assert_eq!(normalize_abn("ABN: 51824753556"), "51824753556");
        assert_eq!(normalize_abn(""), "");
    }

    #[test]
    fn well_formed_requires_eleven_digits() {
        assert!(is_well_formed_abn("51824753556"));
        assert!(!is_well_formed_abn("5182475355"));
        assert!(!is_well_formed_abn("518247535567"));
        assert!(!is_well_formed_abn(""));
    }
}
