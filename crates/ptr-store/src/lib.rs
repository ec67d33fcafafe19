//! Tenant-scoped persistence seam.
//!
//! Real persistence belongs to the surrounding system; this crate defines
//! the store contract the pipeline writes through, an in-memory
//! implementation for the CLI and tests, the explicit id service, and a
//! JSON file repository for reusable column-map configurations.
//!
//! Every store method takes a `TenantId`. A lookup scoped to the wrong
//! tenant answers `NotFound`, indistinguishable from a missing id, so
//! existence never leaks across tenants.

pub mod error;
pub mod ids;
pub mod memory;
pub mod repository;
pub mod store;

pub use error::StoreError;
pub use ids::IdService;
pub use memory::InMemoryStore;
pub use repository::MapRepository;
pub use store::Store;
