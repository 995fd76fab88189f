use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numeric::parse_decimal;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Kind of extracted table line.
///
/// `Holding` rows never aggregate other rows; `Subtotal`/`Total`/`GrandTotal`
/// rows are claims about the sum of the holdings beneath their section path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowType {
    Holding,
    Subtotal,
    Total,
    GrandTotal,
}

impl std::fmt::Display for RowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Holding => write!(f, "HOLDING"),
            Self::Subtotal => write!(f, "SUBTOTAL"),
            Self::Total => write!(f, "TOTAL"),
            Self::GrandTotal => write!(f, "GRAND_TOTAL"),
        }
    }
}

// ---------------------------------------------------------------------------
// Citation
// ---------------------------------------------------------------------------

/// Bounding box in page coordinates, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Where in the source document a row was extracted from. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One extracted table line.
///
/// Every numeric quantity is independently optional and carries an optional
/// `*_raw` sibling holding the literal extracted text. Absence is distinct
/// from zero throughout. Rows are created once by extraction, possibly
/// dropped or rewritten by the sanitizer, and never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row {
    /// Position in the section hierarchy; empty at the document root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub section_path: Vec<String>,

    /// `None` when extraction could not determine the row kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_type: Option<RowType>,

    /// Subtotal/total caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Investment name for holdings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fair_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fair_value_raw: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_raw: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_raw: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_raw: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

impl Row {
    /// Fair value: structured field if present, else a parse of the raw text.
    pub fn fair_value(&self) -> Option<Decimal> {
        field_value(self.fair_value, self.fair_value_raw.as_deref())
    }

    pub fn cost(&self) -> Option<Decimal> {
        field_value(self.cost, self.cost_raw.as_deref())
    }

    pub fn quantity(&self) -> Option<Decimal> {
        field_value(self.quantity, self.quantity_raw.as_deref())
    }

    pub fn percent(&self) -> Option<Decimal> {
        field_value(self.percent, self.percent_raw.as_deref())
    }

    /// Display name: investment for holdings, caption for aggregate rows.
    pub fn name(&self) -> Option<&str> {
        self.investment
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.label.as_deref().filter(|s| !s.trim().is_empty()))
    }

    pub fn is_holding(&self) -> bool {
        self.row_type == Some(RowType::Holding)
    }

    /// Subtotal, total, or grand-total claim.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self.row_type,
            Some(RowType::Subtotal) | Some(RowType::Total) | Some(RowType::GrandTotal)
        )
    }
}

fn field_value(structured: Option<Decimal>, raw: Option<&str>) -> Option<Decimal> {
    if structured.is_some() {
        return structured;
    }
    raw.and_then(|r| parse_decimal(r).value())
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Render a section path for messages: `"Fund A > Corporate Bonds"`, or
/// `"(root)"` for the empty path.
pub fn path_display(path: &[String]) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.join(" > ")
    }
}

/// Normalize free text for comparison: lowercase, collapsed whitespace.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_value_wins_over_raw() {
        let row = Row {
            fair_value: Some(Decimal::from(500)),
            fair_value_raw: Some("1,000".into()),
            ..Row::default()
        };
        assert_eq!(row.fair_value(), Some(Decimal::from(500)));
    }

    #[test]
    fn raw_parsed_when_structured_absent() {
        let row = Row {
            fair_value_raw: Some("$1,293,340".into()),
            ..Row::default()
        };
        assert_eq!(row.fair_value(), Some(Decimal::from(1_293_340)));
    }

    #[test]
    fn absent_is_not_zero() {
        let row = Row::default();
        assert_eq!(row.fair_value(), None);
        assert_eq!(row.percent(), None);
    }

    #[test]
    fn name_prefers_investment_then_label() {
        let row = Row {
            investment: Some("  ".into()),
            label: Some("Total Energy".into()),
            ..Row::default()
        };
        assert_eq!(row.name(), Some("Total Energy"));
    }

    #[test]
    fn path_display_root() {
        assert_eq!(path_display(&[]), "(root)");
        assert_eq!(
            path_display(&["Fund A".into(), "Energy".into()]),
            "Fund A > Energy"
        );
    }

    #[test]
    fn row_type_serde_names() {
        let json = serde_json::to_string(&RowType::GrandTotal).unwrap();
        assert_eq!(json, "\"GRAND_TOTAL\"");
    }
}
