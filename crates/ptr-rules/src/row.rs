//! The row-rule pass.

use std::collections::BTreeMap;

use tracing::debug;

use ptr_model::{DeriveExpr, FieldValue, RuleDef, StagedRow};

use crate::error::RuleError;
use crate::predicate;
use crate::LookupSources;

/// Apply one row rule to every non-excluded row, in place.
///
/// Rules execute strictly in declared sequence; this function is called
/// once per rule so each invocation sees every earlier rule's overrides.
pub fn apply_row_rule(
    index: usize,
    rule: &RuleDef,
    rows: &mut [StagedRow],
    lookups: &LookupSources,
) -> Result<(), RuleError> {
    match rule {
        RuleDef::Filter { predicate, reason } => {
            let mut excluded = 0usize;
            for row in rows.iter_mut().filter(|row| !row.is_excluded()) {
                if predicate::evaluate(predicate, row) {
                    row.annotations.exclude(reason.clone());
                    excluded += 1;
                }
            }
            debug!(rule = index, excluded, "filter pass");
        }
        RuleDef::Derive { target, expr } => {
            for row in rows.iter_mut().filter(|row| !row.is_excluded()) {
                let value = evaluate_derive(expr, row);
                row.annotations.overrides.insert(target.clone(), value);
            }
        }
        RuleDef::Rename { from, to } => {
            for row in rows.iter_mut().filter(|row| !row.is_excluded()) {
                let value = row.effective(from);
                row.annotations.overrides.insert(to.clone(), value);
            }
        }
        RuleDef::Cast { field, to, format } => {
            for row in rows.iter_mut().filter(|row| !row.is_excluded()) {
                let current = row.effective(field);
                let cast = match &current {
                    FieldValue::Missing => FieldValue::Missing,
                    FieldValue::Text(text) => {
                        FieldValue::parse(text, *to, format.as_deref())
                            .unwrap_or(FieldValue::Missing)
                    }
                    // Re-render non-text values through the target type.
                    other => FieldValue::parse(&other.render(), *to, format.as_deref())
                        .unwrap_or(FieldValue::Missing),
                };
                row.annotations.overrides.insert(field.clone(), cast);
            }
        }
        RuleDef::JoinLookup {
            dataset,
            key_field,
            match_column,
            take,
        } => {
            let source = lookups
                .get(dataset)
                .ok_or_else(|| RuleError::LookupSourceMissing {
                    label: dataset.clone(),
                })?;
            // First occurrence wins on duplicate keys in the lookup file.
            let mut indexed: BTreeMap<String, &BTreeMap<String, String>> = BTreeMap::new();
            for raw in source {
                if let Some(key) = raw.values.get(match_column) {
                    indexed.entry(key.trim().to_string()).or_insert(&raw.values);
                }
            }
            for row in rows.iter_mut().filter(|row| !row.is_excluded()) {
                let key = row.effective(key_field).render();
                let Some(matched) = indexed.get(key.trim()) else {
                    continue;
                };
                for (aux_column, target) in take {
                    let value = matched
                        .get(aux_column)
                        .map(|v| v.trim())
                        .filter(|v| !v.is_empty())
                        .map(|v| FieldValue::Text(v.to_string()))
                        .unwrap_or(FieldValue::Missing);
                    row.annotations.overrides.insert(target.clone(), value);
                }
            }
        }
        RuleDef::NetReversals { .. } | RuleDef::GroupAggregate { .. } => {
            // Cross-row rules are handled by the second pass.
        }
    }
    Ok(())
}

fn evaluate_derive(expr: &DeriveExpr, row: &StagedRow) -> FieldValue {
    match expr {
        DeriveExpr::Abs { field } => match row.effective(field) {
            FieldValue::Integer(value) => FieldValue::Integer(value.abs()),
            FieldValue::Number(value) => FieldValue::Number(value.abs()),
            _ => FieldValue::Missing,
        },
        DeriveExpr::Copy { field } => row.effective(field),
        DeriveExpr::Concat { fields, separator } => {
            let parts: Vec<String> = fields
                .iter()
                .map(|field| row.effective(field).render())
                .collect();
            FieldValue::Text(parts.join(separator))
        }
        DeriveExpr::DaysBetween { start, end } => {
            match (row.effective(start), row.effective(end)) {
                (FieldValue::Date(from), FieldValue::Date(to)) => {
                    FieldValue::Integer((to - from).num_days())
                }
                _ => FieldValue::Missing,
            }
        }
        DeriveExpr::Constant { value } => value.clone(),
    }
}
