//! Percent-symbol repair.
//!
//! Two recurring artifacts: a `%` glyph misread as a trailing `8`
//! ("1.72%" extracted as "1.728"), and category percents left embedded in
//! subtotal labels ("Automotive - 1.38"). Corrections are conservative:
//! a value that already contains `%` is never touched, and a trailing `8`
//! is only rewritten when the value carries more decimal places than the
//! document's own TOTAL rows use.

use regex::Regex;
use soiaudit_core::numeric::decimal_places;
use soiaudit_core::{Row, RowType};

use crate::fix_log::{row_signature, Confidence, FixAction, FixLogEntry, FixReason, SanitizeOutcome};

/// Category names that appear as industry-exposure summary lines. Used to
/// keep the no-separator label pattern from eating real security names.
const CATEGORY_PATTERN: &str = r"(?i)^(Pharmaceuticals|Technology|Banking|Retail|Consumer|Telecommunications|Transportation|Energy|Healthcare|Financial|Industrial|Materials|Utilities|Real Estate|Media|Insurance|Aerospace|Advertising|Automotive|Chemicals|Construction|Education|Entertainment|Food|Gaming|Hospitality|Internet|Leisure|Manufacturing|Mining|Oil|Packaging|Paper|Semiconductor|Software|Textiles|Tobacco|Wireless|Major Industry).*$";

/// Split a heading like `"Telecommunications -- 7.1%"` into its section name
/// and the raw percent token as written (callers run the OCR correction).
pub fn extract_heading_data(text: &str) -> Option<(String, Option<String>)> {
    let text = text.trim();
    let heading = Regex::new(r"^[A-Za-z\s/&,]+\s*--\s*[\d.,]+%?$").unwrap();
    if !heading.is_match(text) {
        return None;
    }

    let percent = Regex::new(r"--\s*([\d.,]+%?)\s*$")
        .unwrap()
        .captures(text)
        .map(|c| c.get(1).unwrap().as_str().to_string());

    let name = text.split("--").next().unwrap_or("").trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some((name, percent))
}

/// Strip trailing separator dashes from a label: `"Automotive -"` →
/// `"Automotive"`.
fn clean_label_separators(label: &str) -> String {
    Regex::new(r"\s*[-\u{2013}\u{2014}]+\s*$")
        .unwrap()
        .replace(label, "")
        .trim()
        .to_string()
}

/// Repair the `%`-as-`8` misread in a bare number (no `%` present). Only a
/// trailing `8` behind 3+ decimal places is rewritten; shorter values just
/// gain the missing `%`.
pub(crate) fn correct_percent_ocr(number: &str) -> String {
    let number = number.trim();
    if number.contains('%') {
        return number.to_string();
    }
    if number.ends_with('8') && decimal_places(number) >= 3 {
        return format!("{}%", &number[..number.len() - 1]);
    }
    format!("{number}%")
}

/// Extract a percent embedded at the end of a label, applying the OCR
/// correction. Returns `(clean_label, percent)`.
pub fn extract_percent_from_label(label: &str) -> Option<(String, String)> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    if let Some((name, Some(pct))) = extract_heading_data(label) {
        return Some((clean_label_separators(&name), correct_percent_ocr(&pct)));
    }

    // "Automotive - 1.38" style, separator present.
    let with_sep = Regex::new(r"^(.+?)\s*[-\u{2013}\u{2014}]+\s*(\d+\.\d+[8%]?)\s*$").unwrap();
    if let Some(c) = with_sep.captures(label) {
        let name = clean_label_separators(c.get(1).unwrap().as_str());
        let number = c.get(2).unwrap().as_str();
        return Some((name, correct_percent_ocr(number)));
    }

    // "Consumer Goods 2.28" style, no separator: only for known category
    // names, so security names with embedded rates survive.
    let no_sep = Regex::new(r"^(.+?)\s+(\d+\.\d+[8%]?)\s*$").unwrap();
    if let Some(c) = no_sep.captures(label) {
        let name = clean_label_separators(c.get(1).unwrap().as_str());
        if Regex::new(CATEGORY_PATTERN).unwrap().is_match(&name) {
            let number = c.get(2).unwrap().as_str();
            return Some((name, correct_percent_ocr(number)));
        }
    }

    None
}

/// A bare percent value that looks like a misread `%`: no `%` sign, ends in
/// `8`, and 3+ decimal places.
fn is_suspect_percent(value: &str) -> bool {
    let cleaned = value.trim();
    if cleaned.contains('%') {
        return false;
    }
    if !Regex::new(r"^-?\d+\.\d*8$").unwrap().is_match(cleaned) {
        return false;
    }
    decimal_places(cleaned) >= 3
}

/// The decimal precision the document's TOTAL rows use for percents; the
/// most common wins, defaulting to 1.
fn expected_percent_precision(rows: &[Row]) -> usize {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for row in rows {
        if row.row_type != Some(RowType::Total) && row.row_type != Some(RowType::GrandTotal) {
            continue;
        }
        if let Some(pct) = row.percent_raw.as_deref() {
            let places = decimal_places(pct);
            match counts.iter_mut().find(|(p, _)| *p == places) {
                Some((_, n)) => *n += 1,
                None => counts.push((places, 1)),
            }
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, n)| *n)
        .map(|(p, _)| p)
        .unwrap_or(1)
}

/// Repair misread percent values and labels with embedded percents.
pub fn repair_percent_symbols(out: &mut SanitizeOutcome) {
    let expected_precision = expected_percent_precision(&out.rows);

    for idx in 0..out.rows.len() {
        // Trailing-8 repair, gated on the document's own precision.
        if let Some(pct) = out.rows[idx].percent_raw.clone() {
            if is_suspect_percent(&pct) && decimal_places(&pct) > expected_precision {
                let corrected = format!("{}%", &pct.trim()[..pct.trim().len() - 1]);
                let signature = row_signature(&out.rows[idx]);
                let row = &mut out.rows[idx];
                row.percent_raw = Some(corrected.clone());
                row.percent = None;
                out.fix_log.push(
                    FixLogEntry::new(FixReason::MisreadPercentAs8, FixAction::Corrected, Confidence::High)
                        .rows([idx])
                        .detail(signature)
                        .values(pct, corrected),
                );
            }
        }

        // Label cleanup for aggregate rows.
        if !out.rows[idx].is_aggregate() {
            continue;
        }
        let Some(label) = out.rows[idx].label.clone() else {
            continue;
        };

        if let Some((clean_label, embedded_pct)) = extract_percent_from_label(&label) {
            let row = &mut out.rows[idx];
            row.label = Some(clean_label.clone());
            if row.percent_raw.is_none() && row.percent.is_none() {
                row.percent_raw = Some(embedded_pct.clone());
                out.fix_log.push(
                    FixLogEntry::new(
                        FixReason::PercentExtractedFromLabel,
                        FixAction::Corrected,
                        Confidence::High,
                    )
                    .rows([idx])
                    .values(label, format!("label='{clean_label}', pct='{embedded_pct}'")),
                );
            } else if clean_label != label {
                out.fix_log.push(
                    FixLogEntry::new(
                        FixReason::LabelSeparatorStripped,
                        FixAction::Corrected,
                        Confidence::High,
                    )
                    .rows([idx])
                    .values(label, clean_label),
                );
            }
        } else {
            let cleaned = clean_label_separators(&label);
            if cleaned != label {
                out.rows[idx].label = Some(cleaned.clone());
                out.fix_log.push(
                    FixLogEntry::new(
                        FixReason::LabelSeparatorStripped,
                        FixAction::Corrected,
                        Confidence::High,
                    )
                    .rows([idx])
                    .values(label, cleaned),
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
