//! `soiaudit-recon` — hierarchical reconciliation and anomaly classification.
//!
//! Pure engine crate: receives extracted rows and a tolerance/sanitizer
//! configuration, returns a classified validation report. No CLI or IO
//! dependencies. Malformed or missing data never raises — every absence or
//! inconsistency becomes an issue with an explicit severity, so callers
//! always receive a complete report.

pub mod citations;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod summary;
pub mod tree;

pub use config::{NumericField, ToleranceConfig, ValidationConfig};
pub use engine::{reconcile, run};
pub use error::ValidationError;
pub use model::{DocumentInfo, ValidationInput, ValidationReport};
