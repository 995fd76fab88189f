//! Citation and provenance checks.
//!
//! Every check here is a pure predicate over one row (or one row pair),
//! independent of the aggregation tree: raw-text vs structured value
//! agreement, bbox and page bounds, SOI page membership, and the value
//! plausibility battery. No state machine — just predicates feeding the
//! unified issue list.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use soiaudit_core::model::{normalize_text, path_display};
use soiaudit_core::numeric::{parse_decimal, Parsed};
use soiaudit_core::{Issue, IssueCode, Row, RowType};

use crate::config::PlausibilityConfig;
use crate::model::DocumentInfo;

/// Run the full per-row predicate battery.
pub fn check_citations(
    rows: &[Row],
    document: &DocumentInfo,
    soi_pages: &BTreeSet<u32>,
    plausibility: &PlausibilityConfig,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        check_row_type(row, idx, &mut issues);
        check_raw_values(row, idx, &mut issues);
        check_citation_bounds(row, idx, document, soi_pages, &mut issues);
        check_value_plausibility(row, idx, plausibility, &mut issues);
    }

    check_duplicate_holdings(rows, &mut issues);
    check_as_of_date(document, &mut issues);

    issues
}

// ---------------------------------------------------------------------------
// Per-row predicates
// ---------------------------------------------------------------------------

fn check_row_type(row: &Row, idx: usize, issues: &mut Vec<Issue>) {
    if row.row_type.is_none() {
        issues.push(
            Issue::new(
                IssueCode::MissingRowType,
                format!("row type could not be determined for '{}'", row.name().unwrap_or("?")),
            )
            .with_rows([idx])
            .at_section(path_display(&row.section_path)),
        );
    }

    if row.row_type == Some(RowType::Holding) && row.name().is_none() {
        issues.push(
            Issue::new(IssueCode::HoldingMissingInvestment, "holding row has an empty name")
                .with_rows([idx])
                .at_section(path_display(&row.section_path)),
        );
    }
}

/// Re-parse each raw text field and compare against the structured value.
fn check_raw_values(row: &Row, idx: usize, issues: &mut Vec<Issue>) {
    let fields: [(&str, Option<Decimal>, Option<&str>); 4] = [
        ("fair_value", row.fair_value, row.fair_value_raw.as_deref()),
        ("cost", row.cost, row.cost_raw.as_deref()),
        ("quantity", row.quantity, row.quantity_raw.as_deref()),
        ("percent", row.percent, row.percent_raw.as_deref()),
    ];

    for (name, structured, raw) in fields {
        let Some(raw) = raw else { continue };
        let parsed = parse_decimal(raw);

        match &parsed {
            Parsed::MultipleTokens => {
                issues.push(
                    Issue::new(
                        IssueCode::MultipleNumericTokens,
                        format!("{name} text {raw:?} contains multiple numeric tokens"),
                    )
                    .with_rows([idx])
                    .at_section(path_display(&row.section_path)),
                );
                continue;
            }
            Parsed::DashNegative(_) if name == "percent" => {
                // Percents in filings are negated with parentheses; a bare
                // dash is usually a leaked layout separator.
                issues.push(
                    Issue::new(
                        IssueCode::SuspiciousNegativePercent,
                        format!("percent {raw:?} is negative via dash rather than parentheses"),
                    )
                    .with_rows([idx])
                    .at_section(path_display(&row.section_path)),
                );
            }
            _ => {}
        }

        if let (Some(s), Some(p)) = (structured, parsed.value()) {
            if s != p {
                issues.push(
                    Issue::new(
                        IssueCode::CitationValueMismatch,
                        format!("structured {name} {s} disagrees with extracted text {raw:?} ({p})"),
                    )
                    .with_rows([idx])
                    .at_section(path_display(&row.section_path))
                    .with_diff((s - p).abs()),
                );
            }
        }
    }

    // A structured negative percent with no raw text is equally suspect.
    if row.percent_raw.is_none() {
        if let Some(pct) = row.percent {
            if pct < Decimal::ZERO {
                issues.push(
                    Issue::new(
                        IssueCode::SuspiciousNegativePercent,
                        format!("percent {pct} is negative"),
                    )
                    .with_rows([idx])
                    .at_section(path_display(&row.section_path)),
                );
            }
        }
    }
}

fn check_citation_bounds(
    row: &Row,
    idx: usize,
    document: &DocumentInfo,
    soi_pages: &BTreeSet<u32>,
    issues: &mut Vec<Issue>,
) {
    let Some(citation) = &row.citation else { return };

    if let Some(bbox) = &citation.bbox {
        let width = document.page_width;
        let height = document.page_height;
        let x_bad = bbox.x0 < 0.0
            || bbox.x1 < bbox.x0
            || width.map(|w| bbox.x1 > w).unwrap_or(false);
        let y_bad = bbox.y0 < 0.0
            || bbox.y1 < bbox.y0
            || height.map(|h| bbox.y1 > h).unwrap_or(false);
        if x_bad || y_bad {
            issues.push(
                Issue::new(
                    IssueCode::BboxOutOfRange,
                    format!(
                        "bbox ({}, {}, {}, {}) outside page bounds",
                        bbox.x0, bbox.y0, bbox.x1, bbox.y1
                    ),
                )
                .with_rows([idx])
                .at_section(path_display(&row.section_path)),
            );
        }
    }

    if let Some(page_count) = document.page_count {
        if citation.page < 1 || citation.page > page_count {
            issues.push(
                Issue::new(
                    IssueCode::BboxPageOutOfRange,
                    format!("citation page {} outside [1, {page_count}]", citation.page),
                )
                .with_rows([idx])
                .at_section(path_display(&row.section_path)),
            );
        }
    }

    if !soi_pages.is_empty() && !soi_pages.contains(&citation.page) {
        issues.push(
            Issue::new(
                IssueCode::RowFromNonSoiPage,
                format!(
                    "row cited from page {} which is not in the SOI page set",
                    citation.page
                ),
            )
            .with_rows([idx])
            .at_section(path_display(&row.section_path)),
        );
    }
}

fn check_value_plausibility(
    row: &Row,
    idx: usize,
    plausibility: &PlausibilityConfig,
    issues: &mut Vec<Issue>,
) {
    if row.row_type != Some(RowType::Holding) {
        return;
    }

    let fair_value = row.fair_value();

    if let Some(fv) = fair_value {
        if fv < Decimal::ZERO && !is_derivative(row, plausibility) {
            issues.push(
                Issue::new(
                    IssueCode::NegativeFairValue,
                    format!(
                        "non-derivative holding '{}' has negative fair value {fv}",
                        row.name().unwrap_or("?")
                    ),
                )
                .with_rows([idx])
                .at_section(path_display(&row.section_path)),
            );
        }
    }

    // Implied unit price sanity, positive values only.
    if let (Some(fv), Some(qty)) = (fair_value, row.quantity()) {
        if fv > Decimal::ZERO && qty > Decimal::ZERO {
            if let Some(price) = fv.checked_div(qty) {
                let code = if price < plausibility.min_price {
                    Some(IssueCode::PriceTooLow)
                } else if price > plausibility.max_price {
                    Some(IssueCode::PriceTooHigh)
                } else {
                    None
                };
                if let Some(code) = code {
                    issues.push(
                        Issue::new(
                            code,
                            format!(
                                "implied price {price} for '{}' (fair_value={fv}, quantity={qty})",
                                row.name().unwrap_or("?")
                            ),
                        )
                        .with_rows([idx])
                        .at_section(path_display(&row.section_path)),
                    );
                }
            }
        }
    }
}

/// Written options, shorts, swaps and the like legitimately carry negative
/// values.
fn is_derivative(row: &Row, plausibility: &PlausibilityConfig) -> bool {
    let mut text = normalize_text(&row.section_path.join(" "));
    if let Some(name) = row.name() {
        text.push(' ');
        text.push_str(&normalize_text(name));
    }
    plausibility
        .derivative_keywords
        .iter()
        .any(|kw| text.split_whitespace().any(|w| w == kw))
}

// ---------------------------------------------------------------------------
// Row-pair predicates
// ---------------------------------------------------------------------------

/// Holdings in the same section with the same normalized name and fair
/// value are probably one extracted twice.
fn check_duplicate_holdings(rows: &[Row], issues: &mut Vec<Issue>) {
    let mut groups: BTreeMap<(String, String, String), Vec<usize>> = BTreeMap::new();

    for (idx, row) in rows.iter().enumerate() {
        if row.row_type != Some(RowType::Holding) {
            continue;
        }
        let Some(name) = row.name() else { continue };
        let Some(fv) = row.fair_value() else { continue };
        let key = (
            row.section_path.join("\u{1f}"),
            normalize_text(name),
            fv.normalize().to_string(),
        );
        groups.entry(key).or_default().push(idx);
    }

    for ((_, name, fv), members) in groups {
        if members.len() < 2 {
            continue;
        }
        let section = path_display(&rows[members[0]].section_path);
        issues.push(
            Issue::new(
                IssueCode::PossibleDuplicateHoldings,
                format!(
                    "{} holdings named '{name}' share fair value {fv} in one section",
                    members.len()
                ),
            )
            .with_rows(members)
            .at_section(section),
        );
    }
}

// ---------------------------------------------------------------------------
// Document-level predicates
// ---------------------------------------------------------------------------

/// The as-of date printed in the filing should agree with the date embedded
/// in the source filename (`*-YYYY-MM-DD*`).
fn check_as_of_date(document: &DocumentInfo, issues: &mut Vec<Issue>) {
    let Some(as_of) = document.as_of_date.as_deref() else {
        return;
    };

    let file_date = Regex::new(r"(\d{4})-(\d{2})-(\d{2})")
        .unwrap()
        .captures(&document.source_name)
        .and_then(|c| NaiveDate::parse_from_str(c.get(0).unwrap().as_str(), "%Y-%m-%d").ok());
    let Some(file_date) = file_date else { return };

    let as_of_year = Regex::new(r"\b(20\d{2}|19\d{2})\b")
        .unwrap()
        .captures(as_of)
        .and_then(|c| c.get(1).unwrap().as_str().parse::<i32>().ok());
    let Some(as_of_year) = as_of_year else { return };

    if as_of_year != file_date.year() {
        issues.push(Issue::new(
            IssueCode::DateMismatch,
            format!(
                "as-of date '{as_of}' (year {as_of_year}) differs from filename date {file_date}"
            ),
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use soiaudit_core::{BBox, Citation};

    fn document(page_count: u32, soi_pages: &[u32]) -> DocumentInfo {
        DocumentInfo {
            source_name: "fund-2003-05-31.pdf".into(),
            page_count: Some(page_count),
            page_width: Some(612.0),
            page_height: Some(792.0),
            soi_pages: soi_pages.iter().copied().collect(),
            ..DocumentInfo::default()
        }
    }

    fn cited_holding(name: &str, fv: i64, page: u32) -> Row {
        Row {
            section_path: vec!["Common Stocks".into()],
            row_type: Some(RowType::Holding),
            investment: Some(name.into()),
            fair_value: Some(Decimal::from(fv)),
            citation: Some(Citation {
                page,
                bbox: Some(BBox {
                    x0: 50.0,
                    y0: 100.0,
                    x1: 400.0,
                    y1: 112.0,
                }),
            }),
            ..Row::default()
        }
    }

    fn check(rows: &[Row], document: &DocumentInfo) -> Vec<Issue> {
        let soi_pages = document.soi_pages.clone();
        check_citations(rows, document, &soi_pages, &PlausibilityConfig::default())
    }

    fn has_code(issues: &[Issue], code: IssueCode) -> bool {
        issues.iter().any(|i| i.code == code)
    }

    #[test]
    fn clean_row_produces_nothing() {
        let issues = check(&[cited_holding("Acme Corp", 1000, 4)], &document(10, &[4, 5]));
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn citation_page_past_document_end() {
        let issues = check(&[cited_holding("Acme Corp", 1000, 11)], &document(10, &[]));
        assert!(has_code(&issues, IssueCode::BboxPageOutOfRange));
    }

    #[test]
    fn bbox_outside_page() {
        let mut row = cited_holding("Acme Corp", 1000, 4);
        row.citation.as_mut().unwrap().bbox = Some(BBox {
            x0: 50.0,
            y0: 100.0,
            x1: 700.0, // page is 612 wide
            y1: 112.0,
        });
        let issues = check(&[row], &document(10, &[4]));
        assert!(has_code(&issues, IssueCode::BboxOutOfRange));
    }

    #[test]
    fn row_cited_off_the_soi_pages() {
        let issues = check(&[cited_holding("Acme Corp", 1000, 2)], &document(10, &[4, 5, 6]));
        assert!(has_code(&issues, IssueCode::RowFromNonSoiPage));
    }

    #[test]
    fn structured_vs_raw_disagreement() {
        let row = Row {
            row_type: Some(RowType::Holding),
            investment: Some("Acme".into()),
            fair_value: Some(Decimal::from(99_999)),
            fair_value_raw: Some("1,000,000".into()),
            ..Row::default()
        };
        let issues = check(&[row], &DocumentInfo::default());
        assert!(has_code(&issues, IssueCode::CitationValueMismatch));
    }

    #[test]
    fn equivalent_raw_passes() {
        let row = Row {
            row_type: Some(RowType::Holding),
            investment: Some("Acme".into()),
            fair_value: Some(Decimal::from(1_000_000)),
            fair_value_raw: Some("$1,000,000".into()),
            ..Row::default()
        };
        let issues = check(&[row], &DocumentInfo::default());
        assert!(!has_code(&issues, IssueCode::CitationValueMismatch));
    }

    #[test]
    fn missing_row_type() {
        let row = Row {
            investment: Some("mystery".into()),
            ..Row::default()
        };
        let issues = check(&[row], &DocumentInfo::default());
        assert!(has_code(&issues, IssueCode::MissingRowType));
    }

    #[test]
    fn negative_fair_value_on_common_stock() {
        let row = Row {
            section_path: vec!["Common Stocks".into()],
            row_type: Some(RowType::Holding),
            investment: Some("Acme Corp".into()),
            fair_value: Some(Decimal::from(-5000)),
            ..Row::default()
        };
        let issues = check(&[row], &DocumentInfo::default());
        assert!(has_code(&issues, IssueCode::NegativeFairValue));
    }

    #[test]
    fn negative_fair_value_on_written_options_allowed() {
        let row = Row {
            section_path: vec!["Written Options".into()],
            row_type: Some(RowType::Holding),
            investment: Some("Acme Corp put".into()),
            fair_value: Some(Decimal::from(-5000)),
            ..Row::default()
        };
        let issues = check(&[row], &DocumentInfo::default());
        assert!(!has_code(&issues, IssueCode::NegativeFairValue));
    }

    #[test]
    fn implied_price_bounds() {
        let low = Row {
            row_type: Some(RowType::Holding),
            investment: Some("Penny Co".into()),
            fair_value: Some(Decimal::from(1)),
            quantity: Some(Decimal::from(100_000_000)),
            ..Row::default()
        };
        let issues = check(&[low], &DocumentInfo::default());
        assert!(has_code(&issues, IssueCode::PriceTooLow));

        let high = Row {
            row_type: Some(RowType::Holding),
            investment: Some("Unicorn Co".into()),
            fair_value: Some(Decimal::from(5_000_000_000i64)),
            quantity: Some(Decimal::from(10)),
            ..Row::default()
        };
        let issues = check(&[high], &DocumentInfo::default());
        assert!(has_code(&issues, IssueCode::PriceTooHigh));
    }

    #[test]
    fn duplicate_holdings_grouped_once() {
        let rows = vec![
            cited_holding("Acme Corp", 1000, 4),
            cited_holding("ACME  corp", 1000, 5),
            cited_holding("Globex", 2000, 4),
        ];
        let issues = check(&rows, &document(10, &[4, 5]));
        let dupes: Vec<_> = issues
            .iter()
            .filter(|i| i.code == IssueCode::PossibleDuplicateHoldings)
            .collect();
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].row_refs, vec![0, 1]);
    }

    #[test]
    fn dash_negative_percent_is_suspicious() {
        let row = Row {
            row_type: Some(RowType::Holding),
            investment: Some("Acme".into()),
            percent_raw: Some("-1.8".into()),
            ..Row::default()
        };
        let issues = check(&[row], &DocumentInfo::default());
        assert!(has_code(&issues, IssueCode::SuspiciousNegativePercent));
    }

    #[test]
    fn as_of_date_year_mismatch() {
        let doc = DocumentInfo {
            source_name: "fund-2003-05-31.pdf".into(),
            as_of_date: Some("May 31, 2002".into()),
            ..DocumentInfo::default()
        };
        let issues = check(&[], &doc);
        assert!(has_code(&issues, IssueCode::DateMismatch));

        let doc = DocumentInfo {
            source_name: "fund-2003-05-31.pdf".into(),
            as_of_date: Some("May 31, 2003".into()),
            ..DocumentInfo::default()
        };
        let issues = check(&[], &doc);
        assert!(!has_code(&issues, IssueCode::DateMismatch));
    }
}
