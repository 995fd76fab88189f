use serde::Serialize;
use soiaudit_core::Row;

// ---------------------------------------------------------------------------
// Fix log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixAction {
    Converted,
    Dropped,
    Corrected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
}

/// Stable reason code for one class of repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixReason {
    ColumnHeaderAsHolding,
    HeadingRowAsHolding,
    UnlabeledSubtotal,
    #[serde(rename = "MISREAD_PERCENT_AS_8")]
    MisreadPercentAs8,
    PercentExtractedFromLabel,
    LabelSeparatorStripped,
    SummaryTableBlockDetected,
    PageGapFilled,
    PageSetExpanded,
}

impl FixReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColumnHeaderAsHolding => "COLUMN_HEADER_AS_HOLDING",
            Self::HeadingRowAsHolding => "HEADING_ROW_AS_HOLDING",
            Self::UnlabeledSubtotal => "UNLABELED_SUBTOTAL",
            Self::MisreadPercentAs8 => "MISREAD_PERCENT_AS_8",
            Self::PercentExtractedFromLabel => "PERCENT_EXTRACTED_FROM_LABEL",
            Self::LabelSeparatorStripped => "LABEL_SEPARATOR_STRIPPED",
            Self::SummaryTableBlockDetected => "SUMMARY_TABLE_BLOCK_DETECTED",
            Self::PageGapFilled => "PAGE_GAP_FILLED",
            Self::PageSetExpanded => "PAGE_SET_EXPANDED",
        }
    }
}

impl std::fmt::Display for FixReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applied repair. Informational, not destructive: the original
/// extraction is untouched and every entry carries enough to reverse it.
#[derive(Debug, Clone, Serialize)]
pub struct FixLogEntry {
    pub reason: FixReason,
    pub action: FixAction,
    pub confidence: Confidence,
    /// Row indices in the stage's input ordering.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows_affected: Vec<usize>,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl FixLogEntry {
    pub fn new(reason: FixReason, action: FixAction, confidence: Confidence) -> Self {
        Self {
            reason,
            action,
            confidence,
            rows_affected: Vec::new(),
            detail: String::new(),
            old_value: None,
            new_value: None,
        }
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = usize>) -> Self {
        self.rows_affected = rows.into_iter().collect();
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn values(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old_value = Some(old.into());
        self.new_value = Some(new.into());
        self
    }
}

/// Sanitized rows plus the ordered log of what was repaired.
#[derive(Debug, Clone)]
pub struct SanitizeOutcome {
    pub rows: Vec<Row>,
    pub fix_log: Vec<FixLogEntry>,
}

impl SanitizeOutcome {
    pub fn is_clean(&self) -> bool {
        self.fix_log.is_empty()
    }

    pub fn dropped_count(&self) -> usize {
        self.count_action(FixAction::Dropped)
    }

    pub fn converted_count(&self) -> usize {
        self.count_action(FixAction::Converted)
    }

    pub fn corrected_count(&self) -> usize {
        self.count_action(FixAction::Corrected)
    }

    fn count_action(&self, action: FixAction) -> usize {
        self.fix_log.iter().filter(|e| e.action == action).count()
    }

    /// Fix counts grouped by reason code, for the normalization summary.
    pub fn counts_by_reason(&self) -> Vec<(FixReason, usize)> {
        let mut counts: Vec<(FixReason, usize)> = Vec::new();
        for entry in &self.fix_log {
            match counts.iter_mut().find(|(r, _)| *r == entry.reason) {
                Some((_, n)) => *n += 1,
                None => counts.push((entry.reason, 1)),
            }
        }
        counts
    }
}

/// Compact one-line summary of a row for fix-log details.
pub fn row_signature(row: &Row) -> String {
    let row_type = row
        .row_type
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".into());
    let name = row.name().unwrap_or("");
    let name: String = name.chars().take(40).collect();
    let fv = row.fair_value_raw.as_deref().unwrap_or("");
    format!("{row_type}:{name}|fv={fv}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
