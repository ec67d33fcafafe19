//! Rule-list validation: reject malformed configuration before any row is
//! touched.

use std::collections::BTreeSet;

use ptr_model::{
    CanonicalField, CompareOp, DeriveExpr, ResolvedColumnMap, Resolution, RuleDef,
};

use crate::error::RuleError;

/// Validate a rule list against the resolved mapping it will run over.
///
/// Field references must name a canonical field, a passthrough column (by
/// alias or header), or a field an earlier rule introduced. The known-name
/// set grows as `derive`, `rename`, `cast` and `join_lookup` targets are
/// declared, so later rules may reference earlier outputs but not the
/// other way round.
pub fn validate_rules(rules: &[RuleDef], resolved: &ResolvedColumnMap) -> Result<(), RuleError> {
    let mut known = known_fields(resolved);

    for (index, rule) in rules.iter().enumerate() {
        let kind = rule.kind();
        let check = |field: &str, known: &BTreeSet<String>| -> Result<(), RuleError> {
            if known.contains(field) {
                Ok(())
            } else {
                Err(RuleError::UnknownField {
                    index,
                    kind,
                    field: field.to_string(),
                })
            }
        };
        match rule {
            RuleDef::Filter { predicate, .. } => {
                check(&predicate.field, &known)?;
                if predicate.op != CompareOp::IsMissing && predicate.value.is_none() {
                    return Err(RuleError::MissingOperand { index, kind });
                }
            }
            RuleDef::Derive { target, expr } => {
                match expr {
                    DeriveExpr::Abs { field } | DeriveExpr::Copy { field } => {
                        check(field, &known)?;
                    }
                    DeriveExpr::Concat { fields, .. } => {
                        for field in fields {
                            check(field, &known)?;
                        }
                    }
                    DeriveExpr::DaysBetween { start, end } => {
                        check(start, &known)?;
                        check(end, &known)?;
                    }
                    DeriveExpr::Constant { .. } => {}
                }
                known.insert(target.clone());
            }
            RuleDef::Rename { from, to } => {
                check(from, &known)?;
                known.insert(to.clone());
            }
            RuleDef::Cast { field, .. } => {
                check(field, &known)?;
            }
            RuleDef::JoinLookup {
                dataset,
                key_field,
                take,
                ..
            } => {
                check(key_field, &known)?;
                if !resolved.joins.iter().any(|hint| &hint.label == dataset) {
                    return Err(RuleError::UnknownJoinDataset {
                        index,
                        label: dataset.clone(),
                    });
                }
                if take.is_empty() {
                    return Err(RuleError::EmptyTake { index });
                }
                for target in take.values() {
                    known.insert(target.clone());
                }
            }
            RuleDef::NetReversals {
                group_by,
                amount_field,
            } => {
                if group_by.is_empty() {
                    return Err(RuleError::EmptyGroupBy { index, kind });
                }
                for field in group_by {
                    check(field, &known)?;
                }
                check(amount_field, &known)?;
            }
            RuleDef::GroupAggregate {
                group_by,
                source_field,
                target,
                ..
            } => {
                if group_by.is_empty() {
                    return Err(RuleError::EmptyGroupBy { index, kind });
                }
                for field in group_by {
                    check(field, &known)?;
                }
                check(source_field, &known)?;
                known.insert(target.clone());
            }
        }
    }
    Ok(())
}

fn known_fields(resolved: &ResolvedColumnMap) -> BTreeSet<String> {
    let mut known: BTreeSet<String> = CanonicalField::ALL
        .iter()
        .map(|field| field.as_str().to_string())
        .collect();
    for (header, resolution) in &resolved.columns {
        if let Resolution::Passthrough { alias } = resolution {
            known.insert(alias.clone().unwrap_or_else(|| header.clone()));
        }
    }
    known
}
