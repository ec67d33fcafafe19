//! Profile/run configuration merging.
//!
//! When a run names a profile, the profile's configuration sits underneath
//! the run's own: the run wins wherever both speak to the same key. The
//! rule list is the one exception — rule order is semantic, so a non-empty
//! run list replaces the profile list wholesale instead of interleaving.

use std::collections::BTreeMap;

use ptr_model::{ColumnMapConfig, ColumnMapping, DatasetJoinHint, PassthroughColumn};

use crate::utils::normalize_header;

/// Merge profile-level defaults underneath run-specific overrides.
pub fn merge_configs(profile: &ColumnMapConfig, run: &ColumnMapConfig) -> ColumnMapConfig {
    let mut mappings: BTreeMap<_, ColumnMapping> = BTreeMap::new();
    for mapping in &profile.mappings {
        mappings.insert(mapping.field, mapping.clone());
    }
    for mapping in &run.mappings {
        mappings.insert(mapping.field, mapping.clone());
    }

    let mut passthrough: BTreeMap<String, PassthroughColumn> = BTreeMap::new();
    for column in &profile.passthrough {
        passthrough.insert(normalize_header(&column.source), column.clone());
    }
    for column in &run.passthrough {
        passthrough.insert(normalize_header(&column.source), column.clone());
    }

    let mut fallbacks = profile.fallbacks.clone();
    for (field, chain) in &run.fallbacks {
        fallbacks.insert(*field, chain.clone());
    }

    let mut defaults = profile.defaults.clone();
    for (field, value) in &run.defaults {
        defaults.insert(*field, value.clone());
    }

    let mut joins: BTreeMap<String, DatasetJoinHint> = BTreeMap::new();
    for hint in &profile.joins {
        joins.insert(hint.label.clone(), hint.clone());
    }
    for hint in &run.joins {
        joins.insert(hint.label.clone(), hint.clone());
    }

    let rules = if run.rules.is_empty() {
        profile.rules.clone()
    } else {
        run.rules.clone()
    };

    ColumnMapConfig {
        mappings: mappings.into_values().collect(),
        passthrough: passthrough.into_values().collect(),
        fallbacks,
        defaults,
        joins: joins.into_values().collect(),
        rules,
    }
}

#[cfg(test)]
mod tests {
    use ptr_model::{CanonicalField, FieldValue, Predicate, RuleDef, ValueType};

    use super::*;

    fn mapping(source: &str, field: CanonicalField) -> ColumnMapping {
        ColumnMapping {
            source: source.to_string(),
            field,
            value_type: None,
            format: None,
        }
    }

    #[test]
    fn run_mapping_wins_per_field() {
        let profile = ColumnMapConfig {
            mappings: vec![
                mapping("Supplier ABN", CanonicalField::PayeeAbn),
                mapping("Paid On", CanonicalField::PaymentDate),
            ],
            ..Default::default()
        };
        let run = ColumnMapConfig {
            mappings: vec![mapping("Vendor ABN", CanonicalField::PayeeAbn)],
            ..Default::default()
        };
        let merged = merge_configs(&profile, &run);
        let payee = merged
            .mappings
            .iter()
            .find(|m| m.field == CanonicalField::PayeeAbn)
            .expect("payee mapping");
        assert_eq!(payee.source, "Vendor ABN");
        assert!(
            merged
                .mappings
                .iter()
                .any(|m| m.field == CanonicalField::PaymentDate)
        );
    }

    #[test]
    fn run_defaults_shadow_profile_defaults() {
        let mut profile = ColumnMapConfig::default();
        profile.defaults.insert(
            CanonicalField::PaymentTermDays,
            FieldValue::Integer(30),
        );
        let mut run = ColumnMapConfig::default();
        run.defaults
            .insert(CanonicalField::PaymentTermDays, FieldValue::Integer(20));
        let merged = merge_configs(&profile, &run);
        assert_eq!(
            merged.defaults.get(&CanonicalField::PaymentTermDays),
            Some(&FieldValue::Integer(20))
        );
    }

    #[test]
    fn non_empty_run_rules_replace_profile_rules() {
        let profile = ColumnMapConfig {
            rules: vec![RuleDef::Cast {
                field: "paymentAmount".to_string(),
                to: ValueType::Number,
                format: None,
            }],
            ..Default::default()
        };
        let run = ColumnMapConfig {
            rules: vec![RuleDef::Filter {
                predicate: Predicate {
                    field: "paymentAmount".to_string(),
                    op: ptr_model::CompareOp::IsMissing,
                    value: None,
                },
                reason: "no amount".to_string(),
            }],
            ..Default::default()
        };
        let merged = merge_configs(&profile, &run);
        assert_eq!(merged.rules.len(), 1);
        assert_eq!(merged.rules[0].kind(), "filter");

        let empty_run = ColumnMapConfig::default();
        let merged = merge_configs(&profile, &empty_run);
        assert_eq!(merged.rules.len(), 1);
        assert_eq!(merged.rules[0].kind(), "cast");
    }
}
