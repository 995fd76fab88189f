//! `soiaudit-sanitize` — pre-validation repair of extraction artifacts.
//!
//! The extraction stage misclassifies rows in recurring ways: column headers
//! and section headings labeled as holdings, `%` signs misread as `8`,
//! "Top N Holdings" preview tables duplicating the real schedule, and
//! under-counted page sets. Each repair here is independently toggleable,
//! pure (input rows are never mutated), and logged so it can be reversed.

pub mod config;
pub mod fix_log;
pub mod pages;
pub mod percent;
pub mod phantom;
pub mod summary_table;

pub use config::{PageRepairConfig, SanitizeConfig, SummaryTableConfig};
pub use fix_log::{Confidence, FixAction, FixLogEntry, FixReason, SanitizeOutcome};
pub use pages::repair_soi_pages;

use soiaudit_core::Row;

/// Run every enabled row repair in order: phantom-row reclassification,
/// percent-symbol repair, then summary-table block removal.
///
/// Returns the sanitized row list plus the ordered fix log. Row indices in
/// log entries refer to the stage's input ordering; drops renumber later
/// stages.
pub fn sanitize_rows(rows: &[Row], config: &SanitizeConfig) -> SanitizeOutcome {
    let mut out = SanitizeOutcome {
        rows: rows.to_vec(),
        fix_log: Vec::new(),
    };

    if config.reclassify_phantom_rows {
        phantom::reclassify_phantom_rows(&mut out);
    }
    if config.repair_percent_symbols {
        percent::repair_percent_symbols(&mut out);
    }
    if config.drop_summary_tables {
        summary_table::drop_summary_blocks(&mut out, &config.summary_table);
    }

    out
}
