//! `soiaudit-core` — shared row model, numeric parsing, and issue taxonomy.
//!
//! Pure data crate: no IO, no configuration, no heuristics.

pub mod issue;
pub mod model;
pub mod numeric;

pub use issue::{Category, Issue, IssueCode, Severity};
pub use model::{BBox, Citation, Row, RowType};
