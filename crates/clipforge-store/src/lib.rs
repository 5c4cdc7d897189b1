//! Authoritative project and clip state.
//!
//! This crate provides:
//! - Atomic review, render and assembly transitions
//! - Stale-output detection when the approved set changes
//! - Optional JSON state file with restart recovery
//! - Seed file ingestion

pub mod error;
pub mod metrics;
pub mod persist;
pub mod seed;
pub mod state;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use persist::StateFile;
pub use seed::{SeedClip, SeedFile, SeedProject, SeedReport};
pub use state::{
    AssemblyOutcome, AssemblyPlan, AssemblyRecord, ProjectEntry, RenderAdmission, RenderOutcome,
    RenderRecord, ReviewOutcome, StoreState,
};
pub use store::{ClipStore, StoreOptions};
