//! Summary-table block detection.
//!
//! Some filings carry a "Top N Holdings" preview table whose rows duplicate
//! holdings that also appear in the full schedule; extracted together they
//! double-count. A candidate block is a maximal contiguous run of rows
//! sharing a section-path prefix, terminated by a `TOTAL` row. A block is
//! dropped only when BOTH hold: the terminating total's percent of net
//! assets is below the configured threshold, and the block's caption or
//! section names match a configured keyword. Percent alone never drops a
//! block.

use soiaudit_core::model::normalize_text;
use soiaudit_core::{Row, RowType};

use crate::config::SummaryTableConfig;
use crate::fix_log::{Confidence, FixAction, FixLogEntry, FixReason, SanitizeOutcome};

/// A contiguous candidate block ending in a `TOTAL` row.
#[derive(Debug)]
struct Block {
    /// Indices of the member rows, terminator included.
    rows: Vec<usize>,
    /// Index of the terminating `TOTAL` row.
    total_idx: usize,
}

/// Remove summary-table blocks, logging each drop.
pub fn drop_summary_blocks(out: &mut SanitizeOutcome, config: &SummaryTableConfig) {
    let mut to_drop: Vec<usize> = Vec::new();

    for block in find_candidate_blocks(&out.rows) {
        let total = &out.rows[block.total_idx];

        let percent_below = match total.percent() {
            Some(pct) => pct < config.percent_threshold,
            None => false,
        };
        if !percent_below {
            continue;
        }
        if !block_matches_keywords(&out.rows, &block, config) {
            continue;
        }

        let caption = total.label.clone().unwrap_or_default();
        out.fix_log.push(
            FixLogEntry::new(
                FixReason::SummaryTableBlockDetected,
                FixAction::Dropped,
                Confidence::High,
            )
            .rows(block.rows.iter().copied())
            .detail(format!(
                "dropped {} row(s) under '{}' (total percent {} below threshold {})",
                block.rows.len(),
                caption,
                total
                    .percent()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "?".into()),
                config.percent_threshold,
            )),
        );
        to_drop.extend(block.rows.iter().copied());
    }

    if to_drop.is_empty() {
        return;
    }
    to_drop.sort_unstable();
    let mut keep = Vec::with_capacity(out.rows.len() - to_drop.len());
    for (idx, row) in out.rows.drain(..).enumerate() {
        if to_drop.binary_search(&idx).is_err() {
            keep.push(row);
        }
    }
    out.rows = keep;
}

/// Walk the row list for contiguous runs terminated by a `TOTAL` row whose
/// members all live under the total's section path.
fn find_candidate_blocks(rows: &[Row]) -> Vec<Block> {
    let mut blocks = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        if row.row_type != Some(RowType::Total) {
            continue;
        }
        let prefix = &row.section_path;

        let mut start = idx;
        while start > 0 {
            let prev = &rows[start - 1];
            if !shares_prefix(&prev.section_path, prefix) {
                break;
            }
            // A preceding TOTAL closes the previous block.
            if prev.row_type == Some(RowType::Total) {
                break;
            }
            start -= 1;
        }

        if start < idx {
            blocks.push(Block {
                rows: (start..=idx).collect(),
                total_idx: idx,
            });
        }
    }

    blocks
}

fn shares_prefix(path: &[String], prefix: &[String]) -> bool {
    if prefix.is_empty() {
        // A root-level total terminates the whole document, not a block.
        return false;
    }
    path.len() >= prefix.len() && path[..prefix.len()] == prefix[..]
}

fn block_matches_keywords(rows: &[Row], block: &Block, config: &SummaryTableConfig) -> bool {
    let mut texts: Vec<String> = Vec::new();
    let total = &rows[block.total_idx];
    if let Some(label) = total.label.as_deref() {
        texts.push(normalize_text(label));
    }
    for seg in &total.section_path {
        texts.push(normalize_text(seg));
    }

    config.keywords.iter().any(|kw| {
        let kw = normalize_text(kw);
        texts.iter().any(|t| t.contains(&kw))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
