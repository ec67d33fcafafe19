//! Staging input hashing.

use sha2::{Digest, Sha256};

use ptr_model::{RawRow, ResolvedColumnMap};

/// Hex sha256 over the resolved mapping and the raw rows.
///
/// Both serialize through ordered maps, so the hash is stable for
/// identical inputs and changes whenever either the mapping or the data
/// does — the cache key for idempotent re-staging.
pub fn staging_input_hash(
    resolved: &ResolvedColumnMap,
    rows: &[RawRow],
) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(resolved)?);
    hasher.update([0u8]);
    for row in rows {
        hasher.update(serde_json::to_vec(row)?);
        hasher.update([0u8]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use ptr_model::RowNumber;

    use super::*;

    #[test]
    fn hash_is_stable_and_input_sensitive() {
        let resolved = ResolvedColumnMap::default();
        let rows = vec![
            RawRow::new(RowNumber::new(1).expect("row number")).with_value("Amount", "10"),
        ];
        let a = staging_input_hash(&resolved, &rows).expect("hash");
        let b = staging_input_hash(&resolved, &rows).expect("hash");
        assert_eq!(a, b);

        let changed = vec![
            RawRow::new(RowNumber::new(1).expect("row number")).with_value("Amount", "11"),
        ];
        let c = staging_input_hash(&resolved, &changed).expect("hash");
        assert_ne!(a, c);
    }
}
