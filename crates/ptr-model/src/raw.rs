//! Staging input: parsed source rows handed over by the upload collaborator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::RowNumber;

/// One parsed source row, header -> raw cell text.
///
/// Upload parsing happens outside this core; by the time rows arrive here
/// they are ordered and numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub row_number: RowNumber,
    pub values: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new(row_number: RowNumber) -> Self {
        Self {
            row_number,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(header.into(), value.into());
        self
    }
}
