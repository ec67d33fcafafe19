//! Shared data model for the payment-times reporting ingestion core.
//!
//! Everything downstream of ingestion speaks these types: identifier
//! newtypes, the canonical reporting field catalog, column-map and rule
//! configuration, staged rows with their annotation bags, classification
//! batches, and the validation verdict.

pub mod abn;
pub mod cancel;
pub mod classify;
pub mod error;
pub mod field;
pub mod ids;
pub mod mapping;
pub mod raw;
pub mod rules;
pub mod run;
pub mod staged;
pub mod verdict;

pub use abn::{is_well_formed_abn, normalize_abn};
pub use cancel::CancelToken;
pub use classify::{
    BatchLifecycle, BatchStatus, ClassificationBatch, ClassificationResult, ImportIssue,
    OUTCOME_NOT_SMALL_BUSINESS, OUTCOME_SMALL_BUSINESS, Outcome,
};
pub use error::ModelError;
pub use field::{CanonicalField, CoerceError, FieldValue, ValueType};
pub use ids::{Actor, BatchId, DatasetId, ProfileId, RowNumber, RunId, TenantId};
pub use mapping::{
    ColumnMapConfig, ColumnMapping, DatasetJoinHint, FallbackEntry, PassthroughColumn,
    ResolvedColumnMap, Resolution,
};
pub use raw::RawRow;
pub use rules::{
    AggregateOp, CompareOp, DeriveExpr, Predicate, RuleDef,
};
pub use run::{Dataset, DatasetRole, ParseStatus, Run, RunStatus, RunStep};
pub use staged::{Annotations, CellError, ClassificationMark, StagedRow};
pub use verdict::{Finding, FindingCode, GateStatus, Severity, ValidationVerdict, VerdictCounts};
