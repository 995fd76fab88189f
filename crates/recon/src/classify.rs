//! Issue list finalization: dedup and display ordering.
//!
//! Ordering puts arithmetic mismatches first (largest dollar diff on top),
//! then the remaining errors by code, then warnings by code — the order an
//! analyst triages in.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use soiaudit_core::{Category, Issue, Severity};

/// Dedupe then sort a raw issue list for the report.
pub fn finalize(issues: Vec<Issue>) -> Vec<Issue> {
    let mut issues = dedupe_issues(issues);
    sort_issues(&mut issues);
    issues
}

/// Drop repeated reports of the same code against the same rows and
/// section, keeping the first occurrence.
pub fn dedupe_issues(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen: Vec<(String, Option<String>, Vec<usize>)> = Vec::new();
    let mut kept = Vec::with_capacity(issues.len());

    for issue in issues {
        let key = (
            issue.code.as_str().to_string(),
            issue.section_path.clone(),
            issue.row_refs.clone(),
        );
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        kept.push(issue);
    }
    kept
}

/// Stable ordering: arithmetic mismatches by |diff| descending, then other
/// errors, then warnings; ties broken by code and message.
pub fn sort_issues(issues: &mut [Issue]) {
    issues.sort_by(|a, b| sort_key_cmp(a, b));
}

fn priority(issue: &Issue) -> u8 {
    if issue.code.category() == Category::Arithmetic {
        0
    } else if issue.severity == Severity::Error {
        1
    } else {
        2
    }
}

fn diff_magnitude(issue: &Issue) -> Decimal {
    issue.numeric_diff.map(|d| d.abs()).unwrap_or(Decimal::ZERO)
}

fn sort_key_cmp(a: &Issue, b: &Issue) -> Ordering {
    priority(a)
        .cmp(&priority(b))
        .then_with(|| diff_magnitude(b).cmp(&diff_magnitude(a)))
        .then_with(|| a.code.as_str().cmp(b.code.as_str()))
        .then_with(|| a.message.cmp(&b.message))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
