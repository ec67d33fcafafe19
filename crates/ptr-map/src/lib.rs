//! Mapping resolver: turns submitted column-map configuration plus the
//! actual headers of an uploaded dataset into a fully resolved, per-run
//! mapping.
//!
//! Resolution is a pure function over configuration and headers. The same
//! output backs both staging and the preview rendering, so nothing in this
//! crate touches a store or emits side effects beyond tracing.

pub mod error;
pub mod merge;
pub mod resolver;
pub mod utils;

pub use error::MapError;
pub use merge::merge_configs;
pub use resolver::resolve;
pub use utils::normalize_header;
