//! End-to-end runs through the full pipeline, plus property tests over the
//! tolerance policy and the reconciliation arithmetic.

use proptest::prelude::*;
use rust_decimal::Decimal;
use soiaudit_core::{Category, IssueCode, Row, RowType, Severity};
use soiaudit_recon::config::{FieldTolerance, NumericField, ToleranceConfig};
use soiaudit_recon::model::{DeclaredTotals, DocumentInfo};
use soiaudit_recon::{run, ValidationConfig, ValidationInput};

fn holding(path: &[&str], name: &str, fv: i64) -> Row {
    Row {
        section_path: path.iter().map(|s| s.to_string()).collect(),
        row_type: Some(RowType::Holding),
        investment: Some(name.into()),
        fair_value: Some(Decimal::from(fv)),
        ..Row::default()
    }
}

fn subtotal(path: &[&str], label: &str, fv: i64) -> Row {
    Row {
        section_path: path.iter().map(|s| s.to_string()).collect(),
        row_type: Some(RowType::Subtotal),
        label: Some(label.into()),
        fair_value: Some(Decimal::from(fv)),
        ..Row::default()
    }
}

fn input(rows: Vec<Row>) -> ValidationInput {
    ValidationInput {
        document: DocumentInfo {
            source_name: "test.pdf".into(),
            ..DocumentInfo::default()
        },
        rows,
    }
}

fn arithmetic_codes(report: &soiaudit_recon::ValidationReport) -> Vec<IssueCode> {
    report
        .issues
        .iter()
        .filter(|i| i.code.category() == Category::Arithmetic)
        .map(|i| i.code)
        .collect()
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn matching_subtotal_is_clean() {
    let report = run(
        &ValidationConfig::default(),
        &input(vec![
            holding(&["A"], "x", 100),
            holding(&["A"], "y", 200),
            subtotal(&["A"], "Subtotal A", 300),
        ]),
    );
    assert!(arithmetic_codes(&report).is_empty());
    assert_eq!(report.summary.error_count, 0);
    assert!(report.is_trustworthy());
}

#[test]
fn off_by_fifty_subtotal() {
    let report = run(
        &ValidationConfig::default(),
        &input(vec![
            holding(&["A"], "x", 100),
            holding(&["A"], "y", 200),
            subtotal(&["A"], "Subtotal A", 250),
        ]),
    );
    assert_eq!(arithmetic_codes(&report), vec![IssueCode::ArithMismatchFv]);
    assert_eq!(report.issues[0].numeric_diff, Some(Decimal::from(50)));
    assert_eq!(report.summary.sections_failing_subtotal, 1);
    assert_eq!(report.summary.max_dollar_diff, Decimal::from(50));
    assert!(!report.is_trustworthy());
}

#[test]
fn grand_total_roll_up() {
    let grand = |fv: i64| Row {
        row_type: Some(RowType::GrandTotal),
        label: Some("Total investments".into()),
        fair_value: Some(Decimal::from(fv)),
        ..Row::default()
    };
    let rows = |grand_fv: i64| {
        vec![
            holding(&["A"], "x", 300),
            subtotal(&["A"], "Subtotal A", 300),
            holding(&["B"], "y", 700),
            subtotal(&["B"], "Subtotal B", 700),
            grand(grand_fv),
        ]
    };

    let clean = run(&ValidationConfig::default(), &input(rows(1000)));
    assert!(arithmetic_codes(&clean).is_empty());

    let off = run(&ValidationConfig::default(), &input(rows(950)));
    assert_eq!(arithmetic_codes(&off), vec![IssueCode::RootTotalMismatchFv]);
    assert_eq!(off.issues[0].numeric_diff, Some(Decimal::from(50)));
    assert_eq!(off.summary.sections_failing_rollup, 1);
}

#[test]
fn summary_block_at_76_percent_survives() {
    // Eleven holdings terminated by "Total X" at 76% of net assets: above
    // the 50% threshold and keyword-free, so nothing is dropped.
    let mut rows: Vec<Row> = (0..11)
        .map(|i| holding(&["X"], &format!("Holding {i}"), 100))
        .collect();
    rows.push(Row {
        section_path: vec!["X".into()],
        row_type: Some(RowType::Total),
        label: Some("Total X".into()),
        fair_value: Some(Decimal::from(1100)),
        percent_raw: Some("76%".into()),
        ..Row::default()
    });

    let report = run(&ValidationConfig::default(), &input(rows));
    assert_eq!(report.meta.row_counts.total_rows, 12);
    assert!(!report
        .issues
        .iter()
        .any(|i| i.code == IssueCode::SummaryTableBlockDetected));
}

#[test]
fn dropped_summary_block_reported_and_logged() {
    let rows = vec![
        holding(&["Top Ten Holdings"], "Acme", 400),
        holding(&["Top Ten Holdings"], "Globex", 300),
        Row {
            section_path: vec!["Top Ten Holdings".into()],
            row_type: Some(RowType::Total),
            label: Some("Total Top Ten Holdings".into()),
            fair_value: Some(Decimal::from(700)),
            percent_raw: Some("24.3%".into()),
            ..Row::default()
        },
        holding(&["Common Stocks"], "Acme", 400),
        subtotal(&["Common Stocks"], "Subtotal Common Stocks", 400),
    ];
    let report = run(&ValidationConfig::default(), &input(rows));

    assert!(report
        .issues
        .iter()
        .any(|i| i.code == IssueCode::SummaryTableBlockDetected));
    assert!(report
        .issues
        .iter()
        .any(|i| i.code == IssueCode::NormalizationApplied));
    assert_eq!(report.meta.row_counts.total_rows, 2);
    assert!(!report.fix_log.is_empty());
    // The preview rows no longer poison the arithmetic.
    assert!(arithmetic_codes(&report).is_empty());
}

#[test]
fn page_expansion_feeds_citation_checks() {
    let input = ValidationInput {
        document: DocumentInfo {
            source_name: "fund-2003-05-31.pdf".into(),
            page_count: Some(25),
            soi_pages: [2, 3, 4, 17, 18, 19].into_iter().collect(),
            ..DocumentInfo::default()
        },
        rows: vec![
            Row {
                citation: Some(soiaudit_core::Citation { page: 10, bbox: None }),
                ..holding(&["A"], "x", 100)
            },
            subtotal(&["A"], "Subtotal A", 100),
        ],
    };
    let report = run(&ValidationConfig::default(), &input);

    // 6 pages over an 18-page span is 33% coverage: the whole 2..19 range
    // is assumed contiguous, so page 10 is no longer foreign.
    let expected: Vec<u32> = (2..=19).collect();
    assert_eq!(report.effective_soi_pages, expected);
    assert!(!report
        .issues
        .iter()
        .any(|i| i.code == IssueCode::RowFromNonSoiPage));
}

#[test]
fn citation_page_past_document_end() {
    let input = ValidationInput {
        document: DocumentInfo {
            source_name: "t.pdf".into(),
            page_count: Some(10),
            ..DocumentInfo::default()
        },
        rows: vec![
            Row {
                citation: Some(soiaudit_core::Citation { page: 11, bbox: None }),
                ..holding(&["A"], "x", 100)
            },
            subtotal(&["A"], "Subtotal A", 100),
        ],
    };
    let report = run(&ValidationConfig::default(), &input);
    assert!(report
        .issues
        .iter()
        .any(|i| i.code == IssueCode::BboxPageOutOfRange));
}

#[test]
fn orphan_pair_yields_exactly_one_issue() {
    let total = |label: &str| Row {
        section_path: vec!["A".into()],
        row_type: Some(RowType::Total),
        label: Some(label.into()),
        fair_value: Some(Decimal::from(100)),
        ..Row::default()
    };
    let report = run(
        &ValidationConfig::default(),
        &input(vec![
            holding(&["A"], "x", 100),
            total("Total A"),
            total("Total A"),
        ]),
    );
    let orphans = report
        .issues
        .iter()
        .filter(|i| i.code == IssueCode::OrphanedTotal)
        .count();
    assert_eq!(orphans, 1);
}

#[test]
fn full_document_from_json() {
    let input: ValidationInput = serde_json::from_str(
        r#"{
            "document": {
                "source_name": "growth-fund-2003-05-31.pdf",
                "page_count": 12,
                "page_width": 612.0,
                "page_height": 792.0,
                "soi_pages": [4, 5, 6],
                "as_of_date": "May 31, 2003",
                "declared_totals": {"fair_value": "2470"}
            },
            "rows": [
                {"section_path": ["Convertible Bonds", "Energy"], "row_type": "HOLDING",
                 "investment": "Acme 5% cv. notes", "fair_value_raw": "1,250",
                 "citation": {"page": 4, "bbox": {"x0": 40.0, "y0": 100.0, "x1": 500.0, "y1": 112.0}}},
                {"section_path": ["Convertible Bonds", "Energy"], "row_type": "HOLDING",
                 "investment": "Globex 6% cv. notes", "fair_value_raw": "720",
                 "citation": {"page": 4, "bbox": {"x0": 40.0, "y0": 114.0, "x1": 500.0, "y1": 126.0}}},
                {"section_path": ["Convertible Bonds", "Energy"], "row_type": "SUBTOTAL",
                 "label": "Energy", "fair_value_raw": "1,970"},
                {"section_path": ["Convertible Bonds"], "row_type": "TOTAL",
                 "label": "Total Convertible Bonds", "fair_value_raw": "1,970"},
                {"section_path": ["Common Stocks"], "row_type": "HOLDING",
                 "investment": "Initech", "fair_value_raw": "500",
                 "citation": {"page": 6, "bbox": {"x0": 40.0, "y0": 90.0, "x1": 500.0, "y1": 102.0}}},
                {"section_path": ["Common Stocks"], "row_type": "SUBTOTAL",
                 "label": "Common Stocks", "fair_value_raw": "500"},
                {"row_type": "GRAND_TOTAL", "label": "Total investments", "fair_value_raw": "2,470"}
            ]
        }"#,
    )
    .unwrap();

    let report = run(&ValidationConfig::default(), &input);
    assert!(arithmetic_codes(&report).is_empty(), "{:?}", report.issues);
    assert_eq!(report.summary.error_count, 0);
    assert_eq!(report.meta.row_counts.holding_count, 3);
    assert!(report.sections.iter().any(|s| s.section_path == "Convertible Bonds > Energy"));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn tolerance_is_symmetric(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let tol = ToleranceConfig::default();
        let a = Decimal::from(a);
        let b = Decimal::from(b);
        for field in [NumericField::FairValue, NumericField::Cost, NumericField::Percent] {
            prop_assert_eq!(tol.within(a, b, field), tol.within(b, a, field));
        }
    }

    #[test]
    fn exact_trees_never_mismatch(values in prop::collection::vec(1i64..100_000, 1..12)) {
        let mut rows: Vec<Row> = values
            .iter()
            .enumerate()
            .map(|(i, v)| holding(&["S"], &format!("holding {i}"), *v))
            .collect();
        let sum: i64 = values.iter().sum();
        rows.push(subtotal(&["S"], "Subtotal S", sum));
        rows.push(Row {
            row_type: Some(RowType::GrandTotal),
            label: Some("Total investments".into()),
            fair_value: Some(Decimal::from(sum)),
            ..Row::default()
        });

        let report = run(&ValidationConfig::default(), &input(rows));
        prop_assert!(arithmetic_codes(&report).is_empty());
    }

    #[test]
    fn widening_tolerance_is_monotonic(
        values in prop::collection::vec(1i64..10_000, 1..8),
        reported_skew in -500i64..500,
        widen_by in 0i64..1000,
    ) {
        let mut rows: Vec<Row> = values
            .iter()
            .enumerate()
            .map(|(i, v)| holding(&["S"], &format!("holding {i}"), *v))
            .collect();
        let sum: i64 = values.iter().sum();
        rows.push(subtotal(&["S"], "Subtotal S", sum + reported_skew));

        let narrow_config = ValidationConfig::default();
        let mut wide_config = ValidationConfig::default();
        wide_config.tolerance.fair_value = FieldTolerance {
            abs: narrow_config.tolerance.fair_value.abs + Decimal::from(widen_by),
            rel: narrow_config.tolerance.fair_value.rel,
        };

        let narrow = run(&narrow_config, &input(rows.clone()));
        let wide = run(&wide_config, &input(rows));

        let narrow_codes = arithmetic_codes(&narrow);
        for code in arithmetic_codes(&wide) {
            prop_assert!(narrow_codes.contains(&code));
        }
        prop_assert!(arithmetic_codes(&wide).len() <= narrow_codes.len());
    }

    #[test]
    fn reports_never_panic_on_arbitrary_row_soup(
        types in prop::collection::vec(0u8..5, 0..20),
    ) {
        let rows: Vec<Row> = types
            .iter()
            .enumerate()
            .map(|(i, t)| Row {
                section_path: if i % 3 == 0 { vec![] } else { vec![format!("S{}", i % 4)] },
                row_type: match t {
                    0 => Some(RowType::Holding),
                    1 => Some(RowType::Subtotal),
                    2 => Some(RowType::Total),
                    3 => Some(RowType::GrandTotal),
                    _ => None,
                },
                investment: Some(format!("row {i}")),
                fair_value: (i % 2 == 0).then(|| Decimal::from(i as i64 * 10)),
                ..Row::default()
            })
            .collect();

        let report = run(&ValidationConfig::default(), &input(rows));
        // Every issue carries a severity consistent with its code.
        for issue in &report.issues {
            prop_assert_eq!(issue.severity, issue.code.severity());
        }
        let _ = report.summary.error_count + report.summary.warning_count;
    }
}

#[test]
fn declared_total_and_root_row_checks_both_fire() {
    let input = ValidationInput {
        document: DocumentInfo {
            source_name: "t.pdf".into(),
            declared_totals: DeclaredTotals {
                fair_value: Some(Decimal::from(900)),
                ..DeclaredTotals::default()
            },
            ..DocumentInfo::default()
        },
        rows: vec![
            holding(&["A"], "x", 1000),
            subtotal(&["A"], "Subtotal A", 1000),
            Row {
                row_type: Some(RowType::GrandTotal),
                label: Some("Total investments".into()),
                fair_value: Some(Decimal::from(1050)),
                ..Row::default()
            },
        ],
    };
    let report = run(&ValidationConfig::default(), &input);
    assert!(report
        .issues
        .iter()
        .any(|i| i.code == IssueCode::RootTotalMismatchFv));
    assert!(report
        .issues
        .iter()
        .any(|i| i.code == IssueCode::GrandTotalMismatchFv));
}

#[test]
fn warnings_do_not_block_trust() {
    let report = run(
        &ValidationConfig::default(),
        &input(vec![holding(&["A"], "x", 100)]),
    );
    // MISSING_SUBTOTAL is advisory.
    assert!(report
        .issues
        .iter()
        .all(|i| i.severity == Severity::Warning));
    assert!(report.is_trustworthy());
}
