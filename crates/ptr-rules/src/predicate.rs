//! Predicate evaluation over effective field values.

use std::cmp::Ordering;

use ptr_model::{CompareOp, FieldValue, Predicate, StagedRow};

/// Evaluate a predicate against a row's effective view.
///
/// Comparisons are typed: numbers compare numerically, dates by calendar,
/// text lexically. Mixed or missing operands make ordered comparisons
/// false rather than erroring, since a row-level data gap must not abort
/// the rule pass.
pub fn evaluate(predicate: &Predicate, row: &StagedRow) -> bool {
    let actual = row.effective(&predicate.field);
    match predicate.op {
        CompareOp::IsMissing => actual.is_missing(),
        CompareOp::Eq => match &predicate.value {
            Some(expected) => values_equal(&actual, expected),
            None => false,
        },
        CompareOp::Ne => match &predicate.value {
            Some(expected) => !values_equal(&actual, expected),
            None => false,
        },
        CompareOp::Contains => match (&actual, &predicate.value) {
            (FieldValue::Text(text), Some(FieldValue::Text(needle))) => {
                text.to_lowercase().contains(&needle.to_lowercase())
            }
            _ => false,
        },
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let Some(expected) = &predicate.value else {
                return false;
            };
            match compare(&actual, expected) {
                Some(ordering) => match predicate.op {
                    CompareOp::Lt => ordering == Ordering::Less,
                    CompareOp::Le => ordering != Ordering::Greater,
                    CompareOp::Gt => ordering == Ordering::Greater,
                    CompareOp::Ge => ordering != Ordering::Less,
                    _ => unreachable!(),
                },
                None => false,
            }
        }
    }
}

fn values_equal(actual: &FieldValue, expected: &FieldValue) -> bool {
    if let (Some(a), Some(b)) = (actual.as_number(), expected.as_number()) {
        return a == b;
    }
    actual == expected
}

fn compare(actual: &FieldValue, expected: &FieldValue) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (actual.as_number(), expected.as_number()) {
        return a.partial_cmp(&b);
    }
    match (actual, expected) {
        (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
        (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
