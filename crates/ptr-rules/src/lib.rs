//! Rule engine: ordered row rules, then cross-row rules.
//!
//! Rules read from and write to the staged rows' annotation bags only; the
//! staged standard/custom buckets are never touched. Application starts
//! from a clean rule baseline, so re-applying an edited rule list is
//! idempotent without re-staging. A malformed rule list is rejected before
//! any row is visited — there is no partial annotation state.

pub mod cross;
pub mod error;
pub mod predicate;
pub mod row;
pub mod validate;

use std::collections::BTreeMap;

use tracing::info;

use ptr_model::{Annotations, RawRow, ResolvedColumnMap, RowNumber, RuleDef, StagedRow};

pub use error::RuleError;
pub use validate::validate_rules;

/// Auxiliary dataset rows available to `join_lookup` rules, keyed by the
/// dataset-join label.
pub type LookupSources = BTreeMap<String, Vec<RawRow>>;

/// The annotation state produced by one full rule application.
#[derive(Debug)]
pub struct RuleOutcome {
    /// One entry per staged row, in row-number order.
    pub annotations: Vec<(RowNumber, Annotations)>,
    pub excluded_rows: u64,
}

/// Apply the full rule list to a staged row set.
///
/// Row rules run strictly in declared order; a later rule sees every
/// earlier rule's effect on the same row. Cross-row rules run afterwards
/// over non-excluded rows only, and are order-independent within a group.
pub fn apply_rules(
    resolved: &ResolvedColumnMap,
    rows: &[StagedRow],
    lookups: &LookupSources,
) -> Result<RuleOutcome, RuleError> {
    validate_rules(&resolved.rules, resolved)?;

    let mut working: Vec<StagedRow> = rows.to_vec();
    for row in &mut working {
        row.annotations.reset_rule_state();
    }

    for (index, rule) in resolved.rules.iter().enumerate() {
        if rule.is_cross_row() {
            continue;
        }
        row::apply_row_rule(index, rule, &mut working, lookups)?;
    }
    for (index, rule) in resolved.rules.iter().enumerate() {
        if !rule.is_cross_row() {
            continue;
        }
        cross::apply_cross_rule(index, rule, &mut working)?;
    }

    let excluded_rows = working.iter().filter(|row| row.is_excluded()).count() as u64;
    info!(
        rules = resolved.rules.len(),
        rows = working.len(),
        excluded_rows,
        "applied rule list"
    );
    let mut annotations: Vec<(RowNumber, Annotations)> = working
        .into_iter()
        .map(|row| (row.row_number, row.annotations))
        .collect();
    annotations.sort_by_key(|(number, _)| *number);
    Ok(RuleOutcome {
        annotations,
        excluded_rows,
    })
}
