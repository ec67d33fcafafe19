//! Runs and the datasets attached to them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{DatasetId, ProfileId, RunId, TenantId};

/// Lifecycle of a run. Cancellation retires, it never deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Active,
    Retired,
}

/// The furthest pipeline step committed for a run.
///
/// Steps are strictly ordered; re-committing an earlier step rolls this
/// marker back, which is how downstream invalidation is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStep {
    Created,
    Mapped,
    Staged,
    Ruled,
    Classified,
    Validated,
}

impl RunStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Mapped => "mapped",
            Self::Staged => "staged",
            Self::Ruled => "ruled",
            Self::Classified => "classified",
            Self::Validated => "validated",
        }
    }
}

/// One reporting submission in progress for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub tenant: TenantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileId>,
    pub status: RunStatus,
    pub step: RunStep,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Run {
    pub fn new(id: RunId, tenant: TenantId, profile: Option<ProfileId>) -> Self {
        Self {
            id,
            tenant,
            profile,
            status: RunStatus::Active,
            step: RunStep::Created,
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RunStatus::Active
    }
}

/// Role an uploaded dataset plays within its run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetRole {
    /// The transactions file. One per run.
    Main,
    /// A joined lookup file (vendor master, entity list, ...).
    Auxiliary { label: String },
}

impl DatasetRole {
    pub fn label(&self) -> &str {
        match self {
            Self::Main => "main",
            Self::Auxiliary { label } => label,
        }
    }
}

/// Parse outcome for an uploaded dataset. A failed parse is recorded, not
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParseStatus {
    Parsed,
    Failed { reason: String },
}

/// One uploaded file attached to a run. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub tenant: TenantId,
    pub run: RunId,
    pub role: DatasetRole,
    pub filename: String,
    /// Content-addressed storage reference (hex sha256 of the raw bytes).
    pub content_ref: String,
    pub row_count: u64,
    pub parse_status: ParseStatus,
    /// Detected headers, in file order.
    pub headers: Vec<String>,
}
