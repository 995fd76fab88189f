use rust_decimal::Decimal;
use soiaudit_core::model::path_display;
use soiaudit_core::{Issue, IssueCode, Row};
use soiaudit_sanitize::{repair_soi_pages, sanitize_rows, FixReason};

use crate::citations::check_citations;
use crate::classify;
use crate::config::{NumericField, ToleranceConfig, ValidationConfig};
use crate::model::{
    count_rows, ReportMeta, SectionComputed, ValidationInput, ValidationReport,
};
use crate::summary::compute_summary;
use crate::tree::{build_tree, SectionTree};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the full validation pipeline for one document:
/// sanitize → page repair → tree → arithmetic → citations → classify.
///
/// Side-effect-free and infallible on data: malformed input surfaces as
/// issues, never as an error or panic.
pub fn run(config: &ValidationConfig, input: &ValidationInput) -> ValidationReport {
    let mut issues: Vec<Issue> = Vec::new();

    let outcome = sanitize_rows(&input.rows, &config.sanitizer);
    let (effective_pages, page_fixes) = if config.sanitizer.repair_page_gaps {
        repair_soi_pages(&input.document.soi_pages, &config.sanitizer.page_repair)
    } else {
        (input.document.soi_pages.clone(), Vec::new())
    };

    let mut fix_log = outcome.fix_log.clone();
    fix_log.extend(page_fixes);

    for entry in &fix_log {
        if entry.reason == FixReason::SummaryTableBlockDetected {
            issues.push(
                Issue::new(IssueCode::SummaryTableBlockDetected, entry.detail.clone())
                    .with_rows(entry.rows_affected.iter().copied()),
            );
        }
    }
    if !fix_log.is_empty() {
        let mut reason_counts: Vec<(&str, usize)> = Vec::new();
        for entry in &fix_log {
            match reason_counts.iter_mut().find(|(r, _)| *r == entry.reason.as_str()) {
                Some((_, n)) => *n += 1,
                None => reason_counts.push((entry.reason.as_str(), 1)),
            }
        }
        let breakdown = reason_counts
            .iter()
            .map(|(r, n)| format!("{r} x{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        issues.push(Issue::new(
            IssueCode::NormalizationApplied,
            format!("sanitizer applied {} fix(es): {breakdown}", fix_log.len()),
        ));
    }

    let rows = outcome.rows;
    if rows.is_empty() {
        issues.push(Issue::new(
            IssueCode::NoRowsExtracted,
            "no rows survived extraction and sanitization",
        ));
    }

    let tree = build_tree(&rows);
    issues.extend(tree.issues.iter().cloned());

    let recon = reconcile(&tree, &rows, &config.tolerance);
    issues.extend(recon.issues);

    compare_declared_totals(&recon.root, input, &config.tolerance, &mut issues);

    issues.extend(check_citations(
        &rows,
        &input.document,
        &effective_pages,
        &config.plausibility,
    ));

    let issues = classify::finalize(issues);
    let summary = compute_summary(&issues);

    ValidationReport {
        meta: ReportMeta {
            source_name: input.document.source_name.clone(),
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            row_counts: count_rows(&rows),
        },
        summary,
        issues,
        fix_log,
        sections: recon.sections,
        effective_soi_pages: effective_pages.into_iter().collect(),
    }
}

// ---------------------------------------------------------------------------
// Arithmetic reconciliation
// ---------------------------------------------------------------------------

/// Per-field sums with absence tracked: a node whose holdings all lack a
/// field computes `None` for it and never "matches" a reported value.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSums {
    pub fair_value: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub percent: Option<Decimal>,
}

impl FieldSums {
    fn of_row(row: &Row) -> Self {
        Self {
            fair_value: row.fair_value(),
            cost: row.cost(),
            percent: row.percent(),
        }
    }

    fn accumulate(&mut self, other: FieldSums) {
        accumulate_field(&mut self.fair_value, other.fair_value);
        accumulate_field(&mut self.cost, other.cost);
        accumulate_field(&mut self.percent, other.percent);
    }

    fn is_empty(&self) -> bool {
        self.fair_value.is_none() && self.cost.is_none() && self.percent.is_none()
    }
}

fn accumulate_field(target: &mut Option<Decimal>, value: Option<Decimal>) {
    if let Some(v) = value {
        *target = Some(target.unwrap_or(Decimal::ZERO) + v);
    }
}

pub struct ReconcileOutput {
    pub issues: Vec<Issue>,
    pub sections: Vec<SectionComputed>,
    /// Bottom-up computed sums at the root.
    pub root: FieldSums,
}

/// Single post-order pass: compute each node's sums bottom-up and compare
/// them against that node's reported claims under tolerance.
///
/// A parent's expected contribution from a child section is the child's own
/// reported subtotal when present, else the child's computed sum — genuine
/// extraction noise at one level does not cascade upward.
pub fn reconcile(tree: &SectionTree, rows: &[Row], tolerance: &ToleranceConfig) -> ReconcileOutput {
    let mut out = ReconcileOutput {
        issues: Vec::new(),
        sections: Vec::new(),
        root: FieldSums::default(),
    };
    out.root = reconcile_node(tree, rows, 0, tolerance, &mut out.issues, &mut out.sections);
    out
}

fn reconcile_node(
    tree: &SectionTree,
    rows: &[Row],
    node_idx: usize,
    tolerance: &ToleranceConfig,
    issues: &mut Vec<Issue>,
    sections: &mut Vec<SectionComputed>,
) -> FieldSums {
    let node = &tree.nodes[node_idx];
    let mut computed = FieldSums::default();

    for &child_idx in &node.children {
        let child_computed =
            reconcile_node(tree, rows, child_idx, tolerance, issues, sections);
        let child = &tree.nodes[child_idx];
        let reported = child
            .subtotal
            .or(child.total)
            .map(|ri| FieldSums::of_row(&rows[ri]))
            .unwrap_or_default();
        computed.accumulate(FieldSums {
            fair_value: reported.fair_value.or(child_computed.fair_value),
            cost: reported.cost.or(child_computed.cost),
            percent: reported.percent.or(child_computed.percent),
        });
    }

    for &holding_idx in &node.holdings {
        computed.accumulate(FieldSums::of_row(&rows[holding_idx]));
    }

    let path = path_display(&node.path);

    // Claim hygiene, independent of arithmetic.
    let root_claim = if node.is_root() { tree.grand_total } else { None };
    for claim_idx in [node.subtotal, node.total, root_claim].into_iter().flatten() {
        check_claim_hygiene(&rows[claim_idx], claim_idx, &path, issues);
    }

    if node.is_root() {
        // Anchor the root comparison on the grand-total row when present,
        // else on a total row claiming the empty path.
        if let Some(claim_idx) = tree.grand_total.or(node.total) {
            compare_claim(
                &computed,
                &rows[claim_idx],
                claim_idx,
                &path,
                [
                    IssueCode::RootTotalMismatchFv,
                    IssueCode::RootTotalMismatchCost,
                    IssueCode::RootTotalMismatchPct,
                ],
                tolerance,
                issues,
            );
        }
    } else {
        if let Some(claim_idx) = node.subtotal {
            compare_claim(
                &computed,
                &rows[claim_idx],
                claim_idx,
                &path,
                [
                    IssueCode::ArithMismatchFv,
                    IssueCode::ArithMismatchCost,
                    IssueCode::ArithMismatchPct,
                ],
                tolerance,
                issues,
            );
        }
        if let Some(claim_idx) = node.total {
            compare_claim(
                &computed,
                &rows[claim_idx],
                claim_idx,
                &path,
                [
                    IssueCode::TotalMismatchFv,
                    IssueCode::TotalMismatchCost,
                    IssueCode::TotalMismatchPct,
                ],
                tolerance,
                issues,
            );
        }

        // A leaf section full of holdings with no claim at all.
        if !node.holdings.is_empty()
            && node.subtotal.is_none()
            && node.total.is_none()
            && node.children.is_empty()
        {
            issues.push(
                Issue::new(
                    IssueCode::MissingSubtotal,
                    format!(
                        "section has {} holding(s) but no subtotal row",
                        node.holdings.len()
                    ),
                )
                .at_section(path.clone()),
            );
        }
    }

    if !computed.is_empty() || !node.holdings.is_empty() {
        let reported = node
            .subtotal
            .or(node.total)
            .or(root_claim)
            .map(|ri| FieldSums::of_row(&rows[ri]))
            .unwrap_or_default();
        sections.push(SectionComputed {
            section_path: path,
            computed_fair_value: computed.fair_value,
            computed_cost: computed.cost,
            computed_percent: computed.percent,
            reported_fair_value: reported.fair_value,
            reported_cost: reported.cost,
            reported_percent: reported.percent,
            holding_count: node.holdings.len(),
            child_count: node.children.len(),
        });
    }

    computed
}

/// Label and numeric presence checks on one subtotal/total claim.
fn check_claim_hygiene(row: &Row, row_idx: usize, path: &str, issues: &mut Vec<Issue>) {
    let row_type = row.row_type.map(|t| t.to_string()).unwrap_or_default();

    let label = row.label.as_deref().map(str::trim).unwrap_or("");
    if label.is_empty() {
        issues.push(
            Issue::new(
                IssueCode::SubtotalMissingLabel,
                format!("{row_type} row has an empty label"),
            )
            .with_rows([row_idx])
            .at_section(path.to_string()),
        );
    }

    if row.fair_value().is_none() && row.cost().is_none() && row.percent().is_none() {
        issues.push(
            Issue::new(
                IssueCode::TotalMissingNumeric,
                format!("{row_type} row '{label}' has no parseable numeric value"),
            )
            .with_rows([row_idx])
            .at_section(path.to_string()),
        );
    }
}

/// Field-by-field tolerance compare of computed sums against one claim row.
/// Absent sides are skipped — missing numerics are reported through the
/// dedicated hygiene codes, never as a mismatch.
fn compare_claim(
    computed: &FieldSums,
    row: &Row,
    row_idx: usize,
    path: &str,
    codes: [IssueCode; 3],
    tolerance: &ToleranceConfig,
    issues: &mut Vec<Issue>,
) {
    let reported = FieldSums::of_row(row);
    let label = row.label.as_deref().unwrap_or("");
    let pairs = [
        (computed.fair_value, reported.fair_value, NumericField::FairValue, codes[0]),
        (computed.cost, reported.cost, NumericField::Cost, codes[1]),
        (computed.percent, reported.percent, NumericField::Percent, codes[2]),
    ];

    for (computed_v, reported_v, field, code) in pairs {
        let (Some(c), Some(r)) = (computed_v, reported_v) else {
            continue;
        };
        if tolerance.within(c, r, field) {
            continue;
        }
        let diff = (c - r).abs();
        issues.push(
            Issue::new(
                code,
                format!("computed {field} {c} != reported '{label}' {r}, diff={diff}"),
            )
            .with_rows([row_idx])
            .at_section(path.to_string())
            .with_diff(diff),
        );
    }
}

/// Compare the bottom-up root sums against the document-level declared
/// totals. Independent of (and in addition to) the grand-total-row check.
fn compare_declared_totals(
    root: &FieldSums,
    input: &ValidationInput,
    tolerance: &ToleranceConfig,
    issues: &mut Vec<Issue>,
) {
    let declared = &input.document.declared_totals;
    let pairs = [
        (root.fair_value, declared.fair_value, NumericField::FairValue, IssueCode::GrandTotalMismatchFv),
        (root.cost, declared.cost, NumericField::Cost, IssueCode::GrandTotalMismatchCost),
        (root.percent, declared.percent, NumericField::Percent, IssueCode::GrandTotalMismatchPct),
    ];
    for (computed_v, declared_v, field, code) in pairs {
        let (Some(c), Some(d)) = (computed_v, declared_v) else {
            continue;
        };
        if tolerance.within(c, d, field) {
            continue;
        }
        let diff = (c - d).abs();
        issues.push(
            Issue::new(
                code,
                format!("computed document {field} {c} != declared total {d}, diff={diff}"),
            )
            .at_section(path_display(&[]))
            .with_diff(diff),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
