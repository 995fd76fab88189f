//! Page-gap coverage repair for the SOI page set.
//!
//! The split stage sometimes under-counts the pages holding schedule
//! content. Schedules are contiguous in practice, so a sparse page set with
//! interior gaps usually means missed pages rather than section breaks.

use std::collections::BTreeSet;

use crate::config::PageRepairConfig;
use crate::fix_log::{Confidence, FixAction, FixLogEntry, FixReason};

/// Repair an under-covered page set.
///
/// Coverage ratio = pages present / (pages present + gap pages between the
/// min and max). Below the configured threshold the whole min..max range is
/// filled; otherwise only gaps no wider than the configured bound are
/// filled, and wider gaps are left alone as probable section breaks.
pub fn repair_soi_pages(
    pages: &BTreeSet<u32>,
    config: &PageRepairConfig,
) -> (BTreeSet<u32>, Vec<FixLogEntry>) {
    let mut log = Vec::new();

    let (Some(&min), Some(&max)) = (pages.iter().next(), pages.iter().next_back()) else {
        return (pages.clone(), log);
    };
    let span = (max - min + 1) as usize;
    if pages.len() == span {
        return (pages.clone(), log);
    }

    let coverage = pages.len() as f64 / span as f64;

    if coverage < config.coverage_threshold {
        let repaired: BTreeSet<u32> = (min..=max).collect();
        let added = repaired.len() - pages.len();
        log.push(
            FixLogEntry::new(FixReason::PageSetExpanded, FixAction::Corrected, Confidence::Medium)
                .detail(format!(
                    "coverage {:.0}% below {:.0}%; filled {added} gap page(s) across {min}..{max}",
                    coverage * 100.0,
                    config.coverage_threshold * 100.0,
                )),
        );
        return (repaired, log);
    }

    // Good overall coverage: fill only narrow gaps.
    let mut repaired = pages.clone();
    let present: Vec<u32> = pages.iter().copied().collect();
    for pair in present.windows(2) {
        let gap = pair[1] - pair[0] - 1;
        if gap == 0 {
            continue;
        }
        if gap <= config.max_gap_fill {
            for p in pair[0] + 1..pair[1] {
                repaired.insert(p);
            }
            log.push(
                FixLogEntry::new(FixReason::PageGapFilled, FixAction::Corrected, Confidence::High)
                    .detail(format!(
                        "filled {gap} page(s) between {} and {}",
                        pair[0], pair[1],
                    )),
            );
        }
    }

    (repaired, log)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
