use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Severity + category
// ---------------------------------------------------------------------------

/// `Error` blocks a document from being marked trustworthy; `Warning` is
/// advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Broad family of an issue code, used for reporting and display ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Computed sum vs reported value outside tolerance.
    Arithmetic,
    /// The hierarchy itself is malformed.
    Structural,
    /// Extraction traceability is broken.
    Provenance,
    /// Values are structurally fine but suspicious.
    Plausibility,
    /// Informational record of a sanitizer action, not a failure.
    Sanitizer,
}

// ---------------------------------------------------------------------------
// Issue codes
// ---------------------------------------------------------------------------

/// Closed per-run vocabulary of anomaly codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    // Arithmetic: holdings vs their own subtotal row
    ArithMismatchFv,
    ArithMismatchCost,
    ArithMismatchPct,
    // Arithmetic: section sum vs a non-root TOTAL row
    TotalMismatchFv,
    TotalMismatchCost,
    TotalMismatchPct,
    // Arithmetic: document sum vs the total row attached at the root
    RootTotalMismatchFv,
    RootTotalMismatchCost,
    RootTotalMismatchPct,
    // Arithmetic: document sum vs the document-level declared total
    GrandTotalMismatchFv,
    GrandTotalMismatchCost,
    GrandTotalMismatchPct,

    // Structural
    MissingSubtotal,
    SubtotalMissingLabel,
    TotalMissingNumeric,
    OrphanedTotal,
    SubtotalPathMismatch,
    TotalPathMismatch,
    MissingRowType,
    HoldingMissingInvestment,
    MultipleNumericTokens,
    NoRowsExtracted,

    // Provenance
    CitationValueMismatch,
    BboxOutOfRange,
    BboxPageOutOfRange,
    RowFromNonSoiPage,

    // Plausibility
    NegativeFairValue,
    PriceTooLow,
    PriceTooHigh,
    SuspiciousNegativePercent,
    PossibleDuplicateHoldings,
    DateMismatch,

    // Sanitizer actions
    NormalizationApplied,
    SummaryTableBlockDetected,
}

impl IssueCode {
    pub fn severity(&self) -> Severity {
        match self {
            Self::ArithMismatchFv
            | Self::ArithMismatchCost
            | Self::ArithMismatchPct
            | Self::TotalMismatchFv
            | Self::TotalMismatchCost
            | Self::TotalMismatchPct
            | Self::RootTotalMismatchFv
            | Self::RootTotalMismatchCost
            | Self::RootTotalMismatchPct
            | Self::GrandTotalMismatchFv
            | Self::GrandTotalMismatchCost
            | Self::GrandTotalMismatchPct
            | Self::MissingRowType
            | Self::MultipleNumericTokens
            | Self::NoRowsExtracted
            | Self::CitationValueMismatch
            | Self::NegativeFairValue => Severity::Error,

            Self::MissingSubtotal
            | Self::SubtotalMissingLabel
            | Self::TotalMissingNumeric
            | Self::OrphanedTotal
            | Self::SubtotalPathMismatch
            | Self::TotalPathMismatch
            | Self::HoldingMissingInvestment
            | Self::BboxOutOfRange
            | Self::BboxPageOutOfRange
            | Self::RowFromNonSoiPage
            | Self::PriceTooLow
            | Self::PriceTooHigh
            | Self::SuspiciousNegativePercent
            | Self::PossibleDuplicateHoldings
            | Self::DateMismatch
            | Self::NormalizationApplied
            | Self::SummaryTableBlockDetected => Severity::Warning,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::ArithMismatchFv
            | Self::ArithMismatchCost
            | Self::ArithMismatchPct
            | Self::TotalMismatchFv
            | Self::TotalMismatchCost
            | Self::TotalMismatchPct
            | Self::RootTotalMismatchFv
            | Self::RootTotalMismatchCost
            | Self::RootTotalMismatchPct
            | Self::GrandTotalMismatchFv
            | Self::GrandTotalMismatchCost
            | Self::GrandTotalMismatchPct => Category::Arithmetic,

            Self::MissingSubtotal
            | Self::SubtotalMissingLabel
            | Self::TotalMissingNumeric
            | Self::OrphanedTotal
            | Self::SubtotalPathMismatch
            | Self::TotalPathMismatch
            | Self::MissingRowType
            | Self::HoldingMissingInvestment
            | Self::MultipleNumericTokens
            | Self::NoRowsExtracted => Category::Structural,

            Self::CitationValueMismatch
            | Self::BboxOutOfRange
            | Self::BboxPageOutOfRange
            | Self::RowFromNonSoiPage => Category::Provenance,

            Self::NegativeFairValue
            | Self::PriceTooLow
            | Self::PriceTooHigh
            | Self::SuspiciousNegativePercent
            | Self::PossibleDuplicateHoldings
            | Self::DateMismatch => Category::Plausibility,

            Self::NormalizationApplied | Self::SummaryTableBlockDetected => Category::Sanitizer,
        }
    }

    /// Stable wire name, identical to the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArithMismatchFv => "ARITH_MISMATCH_FV",
            Self::ArithMismatchCost => "ARITH_MISMATCH_COST",
            Self::ArithMismatchPct => "ARITH_MISMATCH_PCT",
            Self::TotalMismatchFv => "TOTAL_MISMATCH_FV",
            Self::TotalMismatchCost => "TOTAL_MISMATCH_COST",
            Self::TotalMismatchPct => "TOTAL_MISMATCH_PCT",
            Self::RootTotalMismatchFv => "ROOT_TOTAL_MISMATCH_FV",
            Self::RootTotalMismatchCost => "ROOT_TOTAL_MISMATCH_COST",
            Self::RootTotalMismatchPct => "ROOT_TOTAL_MISMATCH_PCT",
            Self::GrandTotalMismatchFv => "GRAND_TOTAL_MISMATCH_FV",
            Self::GrandTotalMismatchCost => "GRAND_TOTAL_MISMATCH_COST",
            Self::GrandTotalMismatchPct => "GRAND_TOTAL_MISMATCH_PCT",
            Self::MissingSubtotal => "MISSING_SUBTOTAL",
            Self::SubtotalMissingLabel => "SUBTOTAL_MISSING_LABEL",
            Self::TotalMissingNumeric => "TOTAL_MISSING_NUMERIC",
            Self::OrphanedTotal => "ORPHANED_TOTAL",
            Self::SubtotalPathMismatch => "SUBTOTAL_PATH_MISMATCH",
            Self::TotalPathMismatch => "TOTAL_PATH_MISMATCH",
            Self::MissingRowType => "MISSING_ROW_TYPE",
            Self::HoldingMissingInvestment => "HOLDING_MISSING_INVESTMENT",
            Self::MultipleNumericTokens => "MULTIPLE_NUMERIC_TOKENS",
            Self::NoRowsExtracted => "NO_ROWS_EXTRACTED",
            Self::CitationValueMismatch => "CITATION_VALUE_MISMATCH",
            Self::BboxOutOfRange => "BBOX_OUT_OF_RANGE",
            Self::BboxPageOutOfRange => "BBOX_PAGE_OUT_OF_RANGE",
            Self::RowFromNonSoiPage => "ROW_FROM_NON_SOI_PAGE",
            Self::NegativeFairValue => "NEGATIVE_FAIR_VALUE",
            Self::PriceTooLow => "PRICE_TOO_LOW",
            Self::PriceTooHigh => "PRICE_TOO_HIGH",
            Self::SuspiciousNegativePercent => "SUSPICIOUS_NEGATIVE_PERCENT",
            Self::PossibleDuplicateHoldings => "POSSIBLE_DUPLICATE_HOLDINGS",
            Self::DateMismatch => "DATE_MISMATCH",
            Self::NormalizationApplied => "NORMALIZATION_APPLIED",
            Self::SummaryTableBlockDetected => "SUMMARY_TABLE_BLOCK_DETECTED",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// One anomaly. Immutable once created; the run output is the ordered list
/// of all issues plus the sanitizer's fix log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
    /// Indices of the offending row(s) in the row ordering the issue was
    /// raised against (sanitizer issues use pre-drop indices).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub row_refs: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_diff: Option<Decimal>,
}

impl Issue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            row_refs: Vec::new(),
            section_path: None,
            numeric_diff: None,
        }
    }

    pub fn with_rows(mut self, rows: impl IntoIterator<Item = usize>) -> Self {
        self.row_refs = rows.into_iter().collect();
        self
    }

    pub fn at_section(mut self, path: impl Into<String>) -> Self {
        self.section_path = Some(path.into());
        self
    }

    pub fn with_diff(mut self, diff: Decimal) -> Self {
        self.numeric_diff = Some(diff);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
