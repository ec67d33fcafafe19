//! Header resolution against a submitted configuration.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use ptr_model::{
    CanonicalField, ColumnMapConfig, FallbackEntry, ResolvedColumnMap, Resolution,
};

use crate::error::MapError;
use crate::merge::merge_configs;
use crate::utils::normalize_header;

/// Resolve a run's configuration against the main dataset's headers.
///
/// Profile defaults, when present, merge underneath the run configuration
/// first. Direct mappings take precedence over fallback-chain matches;
/// fallback chains are walked in declared order and stop at the first
/// alternate header present in the dataset or at a literal default. A
/// canonical field none of those reach is listed as unresolved — staging
/// records its absence per row rather than failing the run.
pub fn resolve(
    run_config: &ColumnMapConfig,
    profile_config: Option<&ColumnMapConfig>,
    headers: &[String],
) -> Result<ResolvedColumnMap, MapError> {
    let config = match profile_config {
        Some(profile) => merge_configs(profile, run_config),
        None => run_config.clone(),
    };
    validate(&config)?;

    // First occurrence wins when two dataset headers normalize identically.
    let mut header_index: BTreeMap<String, String> = BTreeMap::new();
    for header in headers {
        header_index
            .entry(normalize_header(header))
            .or_insert_with(|| header.clone());
    }

    // Every header starts as passthrough, aliased when declared.
    let mut aliases: BTreeMap<String, Option<String>> = BTreeMap::new();
    for column in &config.passthrough {
        aliases.insert(normalize_header(&column.source), column.alias.clone());
    }
    let mut columns: BTreeMap<String, Resolution> = BTreeMap::new();
    for header in headers {
        let alias = aliases.get(&normalize_header(header)).cloned().flatten();
        columns.insert(header.clone(), Resolution::Passthrough { alias });
    }

    // Direct mappings claim their headers before any fallback is consulted.
    let mut bound: BTreeSet<CanonicalField> = BTreeSet::new();
    for mapping in &config.mappings {
        let Some(header) = header_index.get(&normalize_header(&mapping.source)) else {
            continue;
        };
        columns.insert(
            header.clone(),
            Resolution::Canonical {
                field: mapping.field,
                value_type: mapping
                    .value_type
                    .unwrap_or_else(|| mapping.field.default_value_type()),
                format: mapping.format.clone(),
            },
        );
        bound.insert(mapping.field);
    }

    // Fallback chains for everything still unbound, in declared order.
    let mut defaults = BTreeMap::new();
    for field in CanonicalField::ALL {
        if bound.contains(&field) {
            continue;
        }
        let Some(chain) = config.fallbacks.get(&field) else {
            continue;
        };
        for entry in chain {
            match entry {
                FallbackEntry::Header { header } => {
                    let Some(original) = header_index.get(&normalize_header(header)) else {
                        continue;
                    };
                    // A header already claimed canonically stays claimed.
                    if matches!(columns.get(original), Some(Resolution::Canonical { .. })) {
                        continue;
                    }
                    columns.insert(
                        original.clone(),
                        Resolution::Canonical {
                            field,
                            value_type: field.default_value_type(),
                            format: None,
                        },
                    );
                    bound.insert(field);
                    break;
                }
                FallbackEntry::Default { value } => {
                    defaults.insert(field, value.clone());
                    bound.insert(field);
                    break;
                }
            }
        }
    }

    // Run-level defaults are the last resort before "unresolved".
    let mut unresolved = Vec::new();
    for field in CanonicalField::ALL {
        if bound.contains(&field) {
            continue;
        }
        match config.defaults.get(&field) {
            Some(value) => {
                defaults.insert(field, value.clone());
            }
            None => unresolved.push(field),
        }
    }

    debug!(
        headers = headers.len(),
        canonical = columns
            .values()
            .filter(|r| matches!(r, Resolution::Canonical { .. }))
            .count(),
        unresolved = unresolved.len(),
        "resolved column map"
    );

    Ok(ResolvedColumnMap {
        headers: headers.to_vec(),
        columns,
        defaults,
        unresolved,
        joins: config.joins,
        rules: config.rules,
    })
}

/// Reject malformed configuration before touching any header.
fn validate(config: &ColumnMapConfig) -> Result<(), MapError> {
    let mut sources = BTreeSet::new();
    let mut fields = BTreeSet::new();
    for mapping in &config.mappings {
        if !sources.insert(normalize_header(&mapping.source)) {
            return Err(MapError::DuplicateSource {
                header: mapping.source.clone(),
            });
        }
        if !fields.insert(mapping.field) {
            return Err(MapError::DuplicateField {
                field: mapping.field,
            });
        }
    }
    let mut aliases = BTreeSet::new();
    for column in &config.passthrough {
        if let Some(alias) = &column.alias
            && !aliases.insert(alias.clone())
        {
            return Err(MapError::DuplicateAlias {
                alias: alias.clone(),
            });
        }
    }
    Ok(())
}
