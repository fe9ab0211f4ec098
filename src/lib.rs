//! STRIDE threat-modeling walkthrough for a connected-vehicle telemetry
//! architecture: a fixed threat catalog, a session that tracks phase,
//! category selection and mitigation flags, and the derived security score
//! and compliance report.

pub mod architecture;
pub mod catalog;
pub mod config;
pub mod error;
pub mod posture;
pub mod report;
pub mod schema;
pub mod session;
pub mod startup;
pub mod store;
pub mod threat;

pub use catalog::ThreatCatalog;
pub use error::{CatalogError, RestoreError, StoreError};
pub use session::{LoadOutcome, Phase, SessionChange, ThreatModelSession, ToggleOutcome};
pub use store::{FileStore, MemoryStore, StateStore};
pub use threat::{Level, StrideCategory, ThreatRecord};
