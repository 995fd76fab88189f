use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use soiaudit_core::{Issue, Row};
use soiaudit_sanitize::FixLogEntry;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Document-level facts from the excluded extraction/orchestration layer:
/// page geometry for bbox checks, the split stage's SOI page set, and the
/// filing-level declared totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    pub source_name: String,
    pub page_count: Option<u32>,
    pub page_width: Option<f64>,
    pub page_height: Option<f64>,
    /// Pages the split stage believes contain schedule content (1-based).
    pub soi_pages: BTreeSet<u32>,
    /// As-of date as printed on the cover page, free text.
    pub as_of_date: Option<String>,
    pub declared_totals: DeclaredTotals,
}

/// The document-level "Total investments" / "Total net assets" figures,
/// compared against the computed root sum independently of any grand-total
/// row in the row list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclaredTotals {
    pub fair_value: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub percent: Option<Decimal>,
}

/// One document's worth of engine input. Each invocation owns its row list;
/// nothing is shared across concurrent calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationInput {
    pub document: DocumentInfo,
    pub rows: Vec<Row>,
}

// ---------------------------------------------------------------------------
// Per-section computed sums
// ---------------------------------------------------------------------------

/// Computed vs reported values for one section, for report drill-down.
#[derive(Debug, Clone, Serialize)]
pub struct SectionComputed {
    pub section_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_fair_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_percent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_fair_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_percent: Option<Decimal>,
    pub holding_count: usize,
    pub child_count: usize,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Pure aggregates over the issue list — nothing here is computed
/// separately from the issues themselves.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    pub error_count: usize,
    pub warning_count: usize,
    pub has_arithmetic_error: bool,
    /// Largest absolute dollar diff across fair-value/cost mismatches.
    pub max_dollar_diff: Decimal,
    /// Sections where holdings fail to sum to their own subtotal.
    pub sections_failing_subtotal: usize,
    /// Sections (root included) where subtotals fail to roll up to a total.
    pub sections_failing_rollup: usize,
    pub counts_by_code: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RowCounts {
    pub total_rows: usize,
    pub holding_count: usize,
    pub subtotal_count: usize,
    pub total_count: usize,
    pub grand_total_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub source_name: String,
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub row_counts: RowCounts,
}

/// Full output of one validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub meta: ReportMeta,
    pub summary: ValidationSummary,
    /// Ordered, deduplicated issues: arithmetic first by diff, then other
    /// errors, then warnings.
    pub issues: Vec<Issue>,
    /// Sanitizer actions, in application order.
    pub fix_log: Vec<FixLogEntry>,
    /// Per-section computed-vs-reported sums.
    pub sections: Vec<SectionComputed>,
    /// SOI page set after coverage repair.
    pub effective_soi_pages: Vec<u32>,
}

impl ValidationReport {
    /// A document is trustworthy when no error-severity issue fired.
    pub fn is_trustworthy(&self) -> bool {
        self.summary.error_count == 0
    }
}

pub fn count_rows(rows: &[Row]) -> RowCounts {
    use soiaudit_core::RowType;
    let mut counts = RowCounts {
        total_rows: rows.len(),
        ..RowCounts::default()
    };
    for row in rows {
        match row.row_type {
            Some(RowType::Holding) => counts.holding_count += 1,
            Some(RowType::Subtotal) => counts.subtotal_count += 1,
            Some(RowType::Total) => counts.total_count += 1,
            Some(RowType::GrandTotal) => counts.grand_total_count += 1,
            None => {}
        }
    }
    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
