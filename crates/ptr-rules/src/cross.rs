//! The cross-row pass.
//!
//! Cross-row rules operate on groups of non-excluded rows sharing a key.
//! Their results depend only on group membership, never on a row's
//! position in the staged set: grouping is by rendered key values and any
//! within-group choice is made by row number, which is part of a row's
//! identity.

use std::collections::BTreeMap;

use tracing::debug;

use ptr_model::{AggregateOp, FieldValue, RuleDef, StagedRow};

use crate::error::RuleError;

pub fn apply_cross_rule(
    index: usize,
    rule: &RuleDef,
    rows: &mut [StagedRow],
) -> Result<(), RuleError> {
    match rule {
        RuleDef::NetReversals {
            group_by,
            amount_field,
        } => net_reversals(index, group_by, amount_field, rows),
        RuleDef::GroupAggregate {
            group_by,
            source_field,
            target,
            op,
        } => group_aggregate(group_by, source_field, target, *op, rows),
        _ => {}
    }
    Ok(())
}

/// Rendered group key for a row.
fn group_key(group_by: &[String], row: &StagedRow) -> Vec<String> {
    group_by
        .iter()
        .map(|field| row.effective(field).render())
        .collect()
}

/// Indexes of non-excluded rows, grouped by key.
fn group_members(group_by: &[String], rows: &[StagedRow]) -> BTreeMap<Vec<String>, Vec<usize>> {
    let mut groups: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
    for (position, row) in rows.iter().enumerate() {
        if row.is_excluded() {
            continue;
        }
        groups.entry(group_key(group_by, row)).or_default().push(position);
    }
    groups
}

/// Exclude equal-magnitude, opposite-sign amount pairs within each group.
///
/// A payment and its reversal net to nothing; both legs are soft-excluded
/// so downstream counts see neither. Pairing is by exact magnitude; when a
/// magnitude has more entries on one side than the other, the surplus rows
/// (highest row numbers) stay in.
fn net_reversals(index: usize, group_by: &[String], amount_field: &str, rows: &mut [StagedRow]) {
    let groups = group_members(group_by, rows);
    let mut netted = 0usize;
    for members in groups.values() {
        // Magnitude (as bits, for exact matching) -> signed entries.
        let mut buckets: BTreeMap<u64, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
        for &position in members {
            let Some(amount) = rows[position].effective(amount_field).as_number() else {
                continue;
            };
            if amount == 0.0 {
                continue;
            }
            let bucket = buckets.entry(amount.abs().to_bits()).or_default();
            if amount > 0.0 {
                bucket.0.push(position);
            } else {
                bucket.1.push(position);
            }
        }
        for (positives, negatives) in buckets.values_mut() {
            positives.sort_by_key(|&p| rows[p].row_number);
            negatives.sort_by_key(|&p| rows[p].row_number);
            let pairs = positives.len().min(negatives.len());
            for &position in positives.iter().take(pairs).chain(negatives.iter().take(pairs)) {
                rows[position]
                    .annotations
                    .exclude("netted reversing entry");
                netted += 1;
            }
        }
    }
    debug!(rule = index, netted, "net_reversals pass");
}

/// Write a group-level aggregate onto every member row's annotations.
fn group_aggregate(
    group_by: &[String],
    source_field: &str,
    target: &str,
    op: AggregateOp,
    rows: &mut [StagedRow],
) {
    let groups = group_members(group_by, rows);
    for members in groups.values() {
        let values: Vec<f64> = members
            .iter()
            .filter_map(|&position| rows[position].effective(source_field).as_number())
            .collect();
        let aggregate = match op {
            AggregateOp::Count => FieldValue::Integer(values.len() as i64),
            AggregateOp::Sum => FieldValue::Number(values.iter().sum()),
            AggregateOp::Min => values
                .iter()
                .copied()
                .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.min(v))))
                .map_or(FieldValue::Missing, FieldValue::Number),
            AggregateOp::Max => values
                .iter()
                .copied()
                .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.max(v))))
                .map_or(FieldValue::Missing, FieldValue::Number),
        };
        for &position in members {
            rows[position]
                .annotations
                .overrides
                .insert(target.to_string(), aggregate.clone());
        }
    }
}
