use rust_decimal::Decimal;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Sanitizer configuration
// ---------------------------------------------------------------------------

/// All sanitizer thresholds in one place, deserialized from the run config.
/// Behavior must be reproducible per configuration; nothing here is mutable
/// at module level.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SanitizeConfig {
    /// Reclassify column headers / headings / unlabeled subtotals that were
    /// extracted as holdings.
    pub reclassify_phantom_rows: bool,
    /// Repair `%` misread as `8` and percents embedded in labels.
    pub repair_percent_symbols: bool,
    /// Drop "Top N Holdings"-style preview blocks.
    pub drop_summary_tables: bool,
    /// Expand under-covered SOI page sets before extraction is trusted.
    pub repair_page_gaps: bool,
    pub summary_table: SummaryTableConfig,
    pub page_repair: PageRepairConfig,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            reclassify_phantom_rows: true,
            repair_percent_symbols: true,
            drop_summary_tables: true,
            repair_page_gaps: true,
            summary_table: SummaryTableConfig::default(),
            page_repair: PageRepairConfig::default(),
        }
    }
}

/// Summary-table block detection. A block is dropped only when BOTH the
/// percent and keyword conditions hold — a minority-weight section is still
/// legitimate, so percent alone never drops anything.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryTableConfig {
    /// Terminating total's percent of net assets must be below this.
    pub percent_threshold: Decimal,
    /// Case-insensitive substrings matched against the block's caption and
    /// section names.
    pub keywords: Vec<String>,
}

impl Default for SummaryTableConfig {
    fn default() -> Self {
        Self {
            percent_threshold: Decimal::from(50),
            keywords: vec![
                "top".into(),
                "largest".into(),
                "summary of".into(),
                "highlights".into(),
                "principal holdings".into(),
                "major holdings".into(),
            ],
        }
    }
}

/// Page-gap coverage repair for the SOI page set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageRepairConfig {
    /// Below this present/span ratio the whole min..max range is assumed
    /// contiguous and filled.
    pub coverage_threshold: f64,
    /// With acceptable coverage, only gaps up to this many pages are filled;
    /// wider gaps are treated as genuine section breaks.
    pub max_gap_fill: u32,
}

impl Default for PageRepairConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: 0.70,
            max_gap_fill: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
