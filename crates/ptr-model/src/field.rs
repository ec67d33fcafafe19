//! The canonical reporting field catalog and typed cell values.
//!
//! Canonical ("standard") fields carry a fixed, reporting-defined meaning.
//! Anything a tenant uploads that does not map onto one of these fields is
//! kept as a passthrough ("custom") column instead.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ModelError;

/// Canonical fields of the payment-times reporting schema.
///
/// This is a closed set: mapping configuration naming a field outside this
/// enum is rejected at load time rather than carried as a dynamic string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    PayeeAbn,
    PayerAbn,
    PayeeName,
    InvoiceReference,
    InvoiceIssueDate,
    InvoiceReceiptDate,
    InvoiceDueDate,
    PaymentDate,
    PaymentAmount,
    PaymentTermDays,
    Description,
    ContractReference,
}

impl CanonicalField {
    /// All canonical fields, in schema order.
    pub const ALL: [CanonicalField; 12] = [
        CanonicalField::PayeeAbn,
        CanonicalField::PayerAbn,
        CanonicalField::PayeeName,
        CanonicalField::InvoiceReference,
        CanonicalField::InvoiceIssueDate,
        CanonicalField::InvoiceReceiptDate,
        CanonicalField::InvoiceDueDate,
        CanonicalField::PaymentDate,
        CanonicalField::PaymentAmount,
        CanonicalField::PaymentTermDays,
        CanonicalField::Description,
        CanonicalField::ContractReference,
    ];

    /// The wire/config name of the field (camelCase, matches serde).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PayeeAbn => "payeeAbn",
            Self::PayerAbn => "payerAbn",
            Self::PayeeName => "payeeName",
            Self::InvoiceReference => "invoiceReference",
            Self::InvoiceIssueDate => "invoiceIssueDate",
            Self::InvoiceReceiptDate => "invoiceReceiptDate",
            Self::InvoiceDueDate => "invoiceDueDate",
            Self::PaymentDate => "paymentDate",
            Self::PaymentAmount => "paymentAmount",
            Self::PaymentTermDays => "paymentTermDays",
            Self::Description => "description",
            Self::ContractReference => "contractReference",
        }
    }

    /// Value type a mapping gets when it does not declare one explicitly.
    pub fn default_value_type(&self) -> ValueType {
        match self {
            Self::PayeeAbn
            | Self::PayerAbn
            | Self::PayeeName
            | Self::InvoiceReference
            | Self::Description
            | Self::ContractReference => ValueType::Text,
            Self::InvoiceIssueDate
            | Self::InvoiceReceiptDate
            | Self::InvoiceDueDate
            | Self::PaymentDate => ValueType::Date,
            Self::PaymentAmount => ValueType::Number,
            Self::PaymentTermDays => ValueType::Integer,
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|field| field.as_str() == s)
            .copied()
            .ok_or_else(|| ModelError::UnknownCanonicalField(s.to_string()))
    }
}

/// Declared type of a mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Integer,
    Number,
    Date,
    Flag,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Date => "date",
            Self::Flag => "flag",
        };
        f.write_str(name)
    }
}

/// A typed cell value in a staged row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
    Flag(bool),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Text content, if this value is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric view used by rule predicates and arithmetic derivations.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Render the value the way it would appear in an export cell.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
            Self::Flag(value) => value.to_string(),
            Self::Missing => String::new(),
        }
    }
}

/// A raw value that could not be coerced to its declared type.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("cannot parse {raw:?} as {target}")]
pub struct CoerceError {
    pub raw: String,
    pub target: String,
}

impl FieldValue {
    /// Parse a raw source cell into a typed value.
    ///
    /// Empty (after trimming) is `Missing` for every type. Dates honor an
    /// explicit `format` when declared; otherwise a small set of common
    /// layouts is tried in order, so parsing stays deterministic.
    pub fn parse(raw: &str, target: ValueType, format: Option<&str>) -> Result<Self, CoerceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::Missing);
        }
        let fail = || CoerceError {
            raw: raw.to_string(),
            target: target.to_string(),
        };
        match target {
            ValueType::Text => Ok(Self::Text(trimmed.to_string())),
            ValueType::Integer => {
                let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
                cleaned
                    .parse::<i64>()
                    .map(Self::Integer)
                    .map_err(|_| fail())
            }
            ValueType::Number => {
                let cleaned: String = trimmed
                    .chars()
                    .filter(|c| *c != ',' && *c != '$')
                    .collect();
                cleaned.parse::<f64>().map(Self::Number).map_err(|_| fail())
            }
            ValueType::Date => {
                if let Some(format) = format {
                    return NaiveDate::parse_from_str(trimmed, format)
                        .map(Self::Date)
                        .map_err(|_| fail());
                }
                const LAYOUTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
                LAYOUTS
                    .iter()
                    .find_map(|layout| NaiveDate::parse_from_str(trimmed, layout).ok())
                    .map(Self::Date)
                    .ok_or_else(fail)
            }
            ValueType::Flag => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(Self::Flag(true)),
                "false" | "no" | "n" | "0" => Ok(Self::Flag(false)),
                _ => Err(fail()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_field_round_trips_via_str() {
        for field in CanonicalField::ALL {
            let parsed: CanonicalField = field.as_str().parse().expect("parse field");
            assert_eq!(parsed, field);
        }
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!("paymentAmount".parse::<CanonicalField>().is_ok());
        assert!("paymentamount".parse::<CanonicalField>().is_err());
    }

    #[test]
    fn empty_parses_to_missing_for_every_type() {
        for target in [
            ValueType::Text,
            ValueType::Integer,
            ValueType::Number,
            ValueType::Date,
            ValueType::Flag,
        ] {
            assert_eq!(
                FieldValue::parse("  ", target, None).expect("missing"),
                FieldValue::Missing
            );
        }
    }

    #[test]
    fn number_parse_strips_currency_formatting() {
        assert_eq!(
            FieldValue::parse("$1,204.50", ValueType::Number, None).expect("number"),
            FieldValue::Number(1204.5)
        );
    }

    #[test]
    fn date_parse_honors_explicit_format() {
        let parsed =
            FieldValue::parse("31/01/2024", ValueType::Date, Some("%d/%m/%Y")).expect("date");
        assert_eq!(
            parsed,
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 31).expect("ymd"))
        );
    }

    #[test]
    fn bad_integer_reports_raw_and_target() {
        let err = FieldValue::parse("12.5", ValueType::Integer, None).expect_err("coerce error");
        assert_eq!(err.raw, "12.5");
        assert_eq!(err.target, "integer");
    }
}
