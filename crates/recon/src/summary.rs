//! Summary counters — pure aggregates over the issue list.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use soiaudit_core::{Category, Issue, IssueCode, Severity};

use crate::model::ValidationSummary;

/// Dollar-denominated mismatch codes that feed `max_dollar_diff`.
fn is_dollar_mismatch(code: IssueCode) -> bool {
    matches!(
        code,
        IssueCode::ArithMismatchFv
            | IssueCode::ArithMismatchCost
            | IssueCode::TotalMismatchFv
            | IssueCode::TotalMismatchCost
            | IssueCode::RootTotalMismatchFv
            | IssueCode::RootTotalMismatchCost
            | IssueCode::GrandTotalMismatchFv
            | IssueCode::GrandTotalMismatchCost
    )
}

fn is_subtotal_mismatch(code: IssueCode) -> bool {
    matches!(
        code,
        IssueCode::ArithMismatchFv | IssueCode::ArithMismatchCost | IssueCode::ArithMismatchPct
    )
}

fn is_rollup_mismatch(code: IssueCode) -> bool {
    code.category() == Category::Arithmetic && !is_subtotal_mismatch(code)
}

/// Compute the run summary from the finalized issue list.
pub fn compute_summary(issues: &[Issue]) -> ValidationSummary {
    let mut summary = ValidationSummary::default();
    let mut failing_subtotal: BTreeSet<&str> = BTreeSet::new();
    let mut failing_rollup: BTreeSet<&str> = BTreeSet::new();

    for issue in issues {
        match issue.severity {
            Severity::Error => summary.error_count += 1,
            Severity::Warning => summary.warning_count += 1,
        }

        *summary
            .counts_by_code
            .entry(issue.code.as_str().to_string())
            .or_insert(0) += 1;

        if issue.code.category() == Category::Arithmetic {
            summary.has_arithmetic_error = true;
        }
        if is_dollar_mismatch(issue.code) {
            if let Some(diff) = issue.numeric_diff {
                summary.max_dollar_diff = summary.max_dollar_diff.max(diff.abs());
            }
        }

        let section = issue.section_path.as_deref().unwrap_or("(root)");
        if is_subtotal_mismatch(issue.code) {
            failing_subtotal.insert(section);
        }
        if is_rollup_mismatch(issue.code) {
            failing_rollup.insert(section);
        }
    }

    summary.sections_failing_subtotal = failing_subtotal.len();
    summary.sections_failing_rollup = failing_rollup.len();
    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
