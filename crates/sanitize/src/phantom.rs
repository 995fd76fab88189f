//! Phantom-holding detection: column headers, section headings, and
//! unlabeled subtotals that extraction mislabeled as `HOLDING` rows. Left
//! in place, each one corrupts the arithmetic of its section.

use regex::Regex;
use soiaudit_core::model::normalize_text;
use soiaudit_core::numeric::parse_decimal;
use soiaudit_core::{Row, RowType};

use crate::fix_log::{row_signature, Confidence, FixAction, FixLogEntry, FixReason, SanitizeOutcome};
use crate::percent::{correct_percent_ocr, extract_heading_data};

/// Column-header phrases that are never investment names.
const COLUMN_HEADER_PHRASES: [&str; 20] = [
    "principal amount",
    "principal amount:",
    "par amount",
    "par amount:",
    "value",
    "value:",
    "value (note 1)",
    "value (note 1):",
    "cost",
    "cost:",
    "shares",
    "shares:",
    "units",
    "units:",
    "amortized cost",
    "amortized cost:",
    "fair value",
    "fair value:",
    "notional",
    "notional:",
];

/// Generic words that do not name a real security.
const GENERIC_INVESTMENT_WORDS: [&str; 13] = [
    "total",
    "subtotal",
    "amount",
    "value",
    "cost",
    "shares",
    "principal",
    "notes",
    "bonds",
    "stocks",
    "securities",
    "investments",
    "other",
];

/// Rewrite misclassified `HOLDING` rows in place, logging each conversion.
pub fn reclassify_phantom_rows(out: &mut SanitizeOutcome) {
    for idx in 0..out.rows.len() {
        if out.rows[idx].row_type != Some(RowType::Holding) {
            continue;
        }

        if let Some(confidence) = is_column_header_holding(&out.rows[idx]) {
            let signature = row_signature(&out.rows[idx]);
            let row = &mut out.rows[idx];
            let label = match row.section_path.last() {
                Some(seg) => format!("Subtotal {seg}"),
                None => "Subtotal".to_string(),
            };
            row.row_type = Some(RowType::Subtotal);
            row.label = Some(label);
            row.investment = None;
            out.fix_log.push(
                FixLogEntry::new(FixReason::ColumnHeaderAsHolding, FixAction::Converted, confidence)
                    .rows([idx])
                    .detail(signature),
            );
            continue;
        }

        if let Some((confidence, heading, pct)) = is_heading_row_as_holding(&out.rows[idx]) {
            let signature = row_signature(&out.rows[idx]);
            let row = &mut out.rows[idx];
            row.row_type = Some(RowType::Subtotal);
            row.label = Some(heading);
            row.investment = None;
            if row.percent_raw.is_none() {
                row.percent_raw = pct;
                row.percent = None;
            }
            out.fix_log.push(
                FixLogEntry::new(FixReason::HeadingRowAsHolding, FixAction::Converted, confidence)
                    .rows([idx])
                    .detail(signature),
            );
            continue;
        }

        if let Some(confidence) = is_unlabeled_subtotal(&out.rows[idx]) {
            let signature = row_signature(&out.rows[idx]);
            let row = &mut out.rows[idx];
            let label = match row.section_path.last() {
                Some(seg) => format!("Subtotal {seg}"),
                None => "Subtotal".to_string(),
            };
            row.row_type = Some(RowType::Subtotal);
            row.label = Some(label);
            row.investment = None;
            out.fix_log.push(
                FixLogEntry::new(FixReason::UnlabeledSubtotal, FixAction::Converted, confidence)
                    .rows([idx])
                    .detail(signature),
            );
        }
    }
}

/// A `HOLDING` whose name is a known column-header phrase, or a short name
/// ending in a colon.
fn is_column_header_holding(row: &Row) -> Option<Confidence> {
    let investment = normalize_text(row.investment.as_deref()?);
    if investment.is_empty() {
        return None;
    }
    if COLUMN_HEADER_PHRASES.contains(&investment.as_str()) {
        return Some(Confidence::High);
    }
    if investment.ends_with(':') && investment.len() < 25 {
        return Some(Confidence::High);
    }
    None
}

/// A `HOLDING` whose name reads like `"Telecommunications -- 7.1%"` and that
/// carries no real per-security numerics.
fn is_heading_row_as_holding(row: &Row) -> Option<(Confidence, String, Option<String>)> {
    let investment = row.investment.as_deref()?;
    let (name, pct) = extract_heading_data(investment)?;
    let pct = pct.map(|p| correct_percent_ocr(&p));

    let has_fv = row.fair_value_raw.is_some() || row.fair_value.is_some();
    let has_cost = row.cost_raw.is_some() || row.cost.is_some();
    let has_qty = row.quantity_raw.is_some() || row.quantity.is_some();

    if !has_fv && !has_cost && !has_qty {
        // Only the percentage embedded in the heading itself.
        return Some((Confidence::High, name, pct));
    }
    if !has_qty {
        return Some((Confidence::Medium, name, pct));
    }
    None
}

/// A `HOLDING` with a fair value but no quantity, named by generic words
/// ("Total", "Securities", ...) or a short colon-terminated fragment.
fn is_unlabeled_subtotal(row: &Row) -> Option<Confidence> {
    let investment = row.investment.as_deref()?;
    let fair_value_raw = row.fair_value_raw.as_deref()?;
    if row.quantity_raw.is_some() || row.quantity.is_some() {
        return None;
    }
    parse_decimal(fair_value_raw).value()?;

    let normalized = normalize_text(investment);
    if normalized.is_empty() {
        return None;
    }

    let word_pattern = Regex::new(r"[a-z]+").unwrap();
    let words: Vec<&str> = word_pattern.find_iter(&normalized).map(|m| m.as_str()).collect();
    if !words.is_empty() && words.iter().all(|w| GENERIC_INVESTMENT_WORDS.contains(w)) {
        return Some(Confidence::Medium);
    }
    if investment.trim().ends_with(':') && investment.len() < 30 {
        return Some(Confidence::High);
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
