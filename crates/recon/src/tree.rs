//! Aggregation tree construction.
//!
//! Rows are grouped into an explicit arena of section nodes keyed by their
//! `section_path` — the hierarchy is built once, never re-derived from path
//! strings during traversal. Each node owns the holdings at its exact path
//! and at most one subtotal and one total claim; surplus or unsupported
//! claims are set aside as orphans rather than silently overwritten.

use std::collections::BTreeMap;

use regex::Regex;
use soiaudit_core::model::{normalize_text, path_display};
use soiaudit_core::{Issue, IssueCode, Row, RowType};

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SectionNode {
    pub path: Vec<String>,
    /// Child node indices, in document order of first appearance.
    pub children: Vec<usize>,
    /// Indices of `HOLDING` rows directly under this exact path.
    pub holdings: Vec<usize>,
    /// Row index of the `SUBTOTAL` claim for this path.
    pub subtotal: Option<usize>,
    /// Row index of the `TOTAL` claim for this path.
    pub total: Option<usize>,
}

impl SectionNode {
    fn new(path: Vec<String>) -> Self {
        Self {
            path,
            children: Vec::new(),
            holdings: Vec::new(),
            subtotal: None,
            total: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

#[derive(Debug)]
pub struct SectionTree {
    /// `nodes[0]` is the root (empty path).
    pub nodes: Vec<SectionNode>,
    /// Row index of the grand-total claim attached at the root.
    pub grand_total: Option<usize>,
    /// Aggregate rows excluded from the tree (duplicate or unsupported
    /// claims).
    pub orphaned: Vec<usize>,
    /// Structural issues found while building.
    pub issues: Vec<Issue>,
}

impl SectionTree {
    pub fn root(&self) -> &SectionNode {
        &self.nodes[0]
    }

    /// Holdings in the subtree rooted at `node_idx`.
    pub fn subtree_holding_count(&self, node_idx: usize) -> usize {
        let node = &self.nodes[node_idx];
        node.holdings.len()
            + node
                .children
                .iter()
                .map(|&c| self.subtree_holding_count(c))
                .sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build the section tree from a sanitized row list.
pub fn build_tree(rows: &[Row]) -> SectionTree {
    let mut nodes = vec![SectionNode::new(Vec::new())];
    let mut index: BTreeMap<Vec<String>, usize> = BTreeMap::new();
    index.insert(Vec::new(), 0);

    // Claims per path, in document order; resolved after attachment so a
    // second claim never overwrites the first.
    let mut subtotal_claims: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
    let mut total_claims: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
    let mut grand_claims: Vec<usize> = Vec::new();

    for (row_idx, row) in rows.iter().enumerate() {
        match row.row_type {
            Some(RowType::Holding) => {
                let node_idx = ensure_node(&mut nodes, &mut index, &row.section_path);
                nodes[node_idx].holdings.push(row_idx);
            }
            Some(RowType::Subtotal) => {
                ensure_node(&mut nodes, &mut index, &row.section_path);
                subtotal_claims
                    .entry(row.section_path.clone())
                    .or_default()
                    .push(row_idx);
            }
            Some(RowType::Total) => {
                ensure_node(&mut nodes, &mut index, &row.section_path);
                total_claims
                    .entry(row.section_path.clone())
                    .or_default()
                    .push(row_idx);
            }
            Some(RowType::GrandTotal) => grand_claims.push(row_idx),
            None => {} // flagged as MISSING_ROW_TYPE by the citation checker
        }
    }

    let mut tree = SectionTree {
        nodes,
        grand_total: None,
        orphaned: Vec::new(),
        issues: Vec::new(),
    };

    resolve_claims(&mut tree, &index, subtotal_claims, RowType::Subtotal, rows);
    resolve_claims(&mut tree, &index, total_claims, RowType::Total, rows);
    resolve_grand_claims(&mut tree, grand_claims, rows);

    orphan_unsupported_claims(&mut tree, rows);
    check_label_paths(&mut tree, rows);

    tree
}

/// Create the node for `path` and every missing ancestor. Every node's path
/// is exactly one segment longer than its parent's.
fn ensure_node(
    nodes: &mut Vec<SectionNode>,
    index: &mut BTreeMap<Vec<String>, usize>,
    path: &[String],
) -> usize {
    let mut parent_idx = 0;
    for depth in 1..=path.len() {
        let prefix = path[..depth].to_vec();
        parent_idx = match index.get(&prefix) {
            Some(&idx) => idx,
            None => {
                let idx = nodes.len();
                nodes.push(SectionNode::new(prefix.clone()));
                nodes[parent_idx].children.push(idx);
                index.insert(prefix, idx);
                idx
            }
        };
    }
    parent_idx
}

fn resolve_claims(
    tree: &mut SectionTree,
    index: &BTreeMap<Vec<String>, usize>,
    claims: BTreeMap<Vec<String>, Vec<usize>>,
    row_type: RowType,
    rows: &[Row],
) {
    for (path, claimants) in claims {
        let node_idx = index[&path];
        let (first, extras) = claimants.split_first().expect("claims are non-empty");

        match row_type {
            RowType::Subtotal => tree.nodes[node_idx].subtotal = Some(*first),
            RowType::Total => tree.nodes[node_idx].total = Some(*first),
            _ => unreachable!(),
        }

        if !extras.is_empty() {
            let label = rows[*first].label.as_deref().unwrap_or("(unlabeled)");
            tree.orphaned.extend(extras.iter().copied());
            tree.issues.push(
                Issue::new(
                    IssueCode::OrphanedTotal,
                    format!(
                        "{} duplicate {row_type} claim(s) at this path; kept '{label}'",
                        extras.len(),
                    ),
                )
                .with_rows(extras.iter().copied())
                .at_section(path_display(&path)),
            );
        }
    }
}

fn resolve_grand_claims(tree: &mut SectionTree, claims: Vec<usize>, rows: &[Row]) {
    let Some((&first, extras)) = claims.split_first() else {
        return;
    };
    tree.grand_total = Some(first);
    if !extras.is_empty() {
        let label = rows[first].label.as_deref().unwrap_or("(unlabeled)");
        tree.orphaned.extend(extras.iter().copied());
        tree.issues.push(
            Issue::new(
                IssueCode::OrphanedTotal,
                format!(
                    "{} duplicate GRAND_TOTAL claim(s); kept '{label}'",
                    extras.len(),
                ),
            )
            .with_rows(extras.iter().copied())
            .at_section(path_display(&[])),
        );
    }
}

/// A subtotal/total claim over a subtree with no holdings anywhere is not a
/// claim about anything; set it aside.
fn orphan_unsupported_claims(tree: &mut SectionTree, rows: &[Row]) {
    for node_idx in 1..tree.nodes.len() {
        if tree.subtree_holding_count(node_idx) > 0 {
            continue;
        }
        let path = path_display(&tree.nodes[node_idx].path);
        for slot in [
            tree.nodes[node_idx].subtotal.take(),
            tree.nodes[node_idx].total.take(),
        ]
        .into_iter()
        .flatten()
        {
            let label = rows[slot].label.as_deref().unwrap_or("(unlabeled)");
            tree.orphaned.push(slot);
            tree.issues.push(
                Issue::new(
                    IssueCode::OrphanedTotal,
                    format!("claim '{label}' has no holdings or child sections beneath it"),
                )
                .with_rows([slot])
                .at_section(path.clone()),
            );
        }
    }
}

/// Flag subtotal/total rows whose label names categories absent from their
/// section path — the usual sign of a claim attached to the wrong section.
fn check_label_paths(tree: &mut SectionTree, rows: &[Row]) {
    let mut issues = Vec::new();
    for node in tree.nodes.iter().skip(1) {
        for (slot, code) in [
            (node.subtotal, IssueCode::SubtotalPathMismatch),
            (node.total, IssueCode::TotalPathMismatch),
        ] {
            let Some(row_idx) = slot else { continue };
            let Some(label) = rows[row_idx].label.as_deref() else {
                continue;
            };
            let keywords = category_keywords(label);
            if keywords.is_empty() || path_contains_keywords(&node.path, &keywords) {
                continue;
            }
            issues.push(
                Issue::new(
                    code,
                    format!("label '{label}' mentions categories not in the section path"),
                )
                .with_rows([row_idx])
                .at_section(path_display(&node.path)),
            );
        }
    }
    tree.issues.extend(issues);
}

/// Category keywords from a claim label: words longer than two characters
/// that are not aggregation boilerplate.
fn category_keywords(label: &str) -> Vec<String> {
    const STOP_WORDS: [&str; 16] = [
        "total",
        "subtotal",
        "investments",
        "securities",
        "cost",
        "value",
        "net",
        "assets",
        "the",
        "and",
        "for",
        "sub",
        "all",
        "other",
        "schedule",
        "fund",
    ];
    let word = Regex::new(r"[A-Za-z]+").unwrap();
    word.find_iter(label)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn path_contains_keywords(path: &[String], keywords: &[String]) -> bool {
    let text = normalize_text(&path.join(" "));
    keywords.iter().any(|k| text.contains(k.as_str()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn holding(path: &[&str], name: &str, fv: i64) -> Row {
        Row {
            section_path: path.iter().map(|s| s.to_string()).collect(),
            row_type: Some(RowType::Holding),
            investment: Some(name.into()),
            fair_value: Some(Decimal::from(fv)),
            ..Row::default()
        }
    }

    fn aggregate(path: &[&str], row_type: RowType, label: &str, fv: i64) -> Row {
        Row {
            section_path: path.iter().map(|s| s.to_string()).collect(),
            row_type: Some(row_type),
            label: Some(label.into()),
            fair_value: Some(Decimal::from(fv)),
            ..Row::default()
        }
    }

    #[test]
    fn prefix_hierarchy() {
        let rows = vec![
            holding(&["Fund A", "Bonds", "Energy"], "Acme 5% notes", 100),
            holding(&["Fund A", "Bonds", "Energy"], "Globex 6% notes", 200),
            holding(&["Fund A", "Equities"], "Initech", 300),
        ];
        let tree = build_tree(&rows);

        // Root + Fund A + Bonds + Energy + Equities.
        assert_eq!(tree.nodes.len(), 5);
        for node_idx in 1..tree.nodes.len() {
            let node = &tree.nodes[node_idx];
            let parent = tree
                .nodes
                .iter()
                .find(|p| p.children.contains(&node_idx))
                .unwrap();
            assert_eq!(node.path.len(), parent.path.len() + 1);
            assert_eq!(&node.path[..parent.path.len()], &parent.path[..]);
        }
        assert_eq!(tree.subtree_holding_count(0), 3);
    }

    #[test]
    fn duplicate_total_claims_yield_one_orphan_issue() {
        let rows = vec![
            holding(&["A"], "x", 100),
            aggregate(&["A"], RowType::Total, "Total A", 100),
            aggregate(&["A"], RowType::Total, "Total A again", 100),
        ];
        let tree = build_tree(&rows);
        let orphan_issues: Vec<_> = tree
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::OrphanedTotal)
            .collect();
        assert_eq!(orphan_issues.len(), 1);
        assert_eq!(orphan_issues[0].row_refs, vec![2]);
        // The first claim stays in the tree.
        let node = tree.nodes.iter().find(|n| n.path == ["A"]).unwrap();
        assert_eq!(node.total, Some(1));
        assert_eq!(tree.orphaned, vec![2]);
    }

    #[test]
    fn three_claims_still_one_issue_per_path() {
        let rows = vec![
            holding(&["A"], "x", 100),
            aggregate(&["A"], RowType::Total, "Total A", 100),
            aggregate(&["A"], RowType::Total, "dup 1", 100),
            aggregate(&["A"], RowType::Total, "dup 2", 100),
        ];
        let tree = build_tree(&rows);
        let orphan_issues: Vec<_> = tree
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::OrphanedTotal)
            .collect();
        assert_eq!(orphan_issues.len(), 1);
        assert_eq!(orphan_issues[0].row_refs, vec![2, 3]);
    }

    #[test]
    fn claim_with_no_holdings_is_orphaned() {
        let rows = vec![
            holding(&["A"], "x", 100),
            aggregate(&["B"], RowType::Subtotal, "Subtotal B", 50),
        ];
        let tree = build_tree(&rows);
        assert_eq!(tree.orphaned, vec![1]);
        let node = tree.nodes.iter().find(|n| n.path == ["B"]).unwrap();
        assert!(node.subtotal.is_none());
        assert!(tree
            .issues
            .iter()
            .any(|i| i.code == IssueCode::OrphanedTotal && i.row_refs == vec![1]));
    }

    #[test]
    fn claim_supported_by_descendant_holdings_is_kept() {
        let rows = vec![
            holding(&["A", "Energy"], "x", 100),
            aggregate(&["A"], RowType::Total, "Total A", 100),
        ];
        let tree = build_tree(&rows);
        assert!(tree.orphaned.is_empty());
        let node = tree.nodes.iter().find(|n| n.path == ["A"]).unwrap();
        assert_eq!(node.total, Some(1));
    }

    #[test]
    fn label_naming_foreign_category_flagged() {
        let rows = vec![
            holding(&["Fund", "Energy"], "x", 100),
            aggregate(
                &["Fund", "Energy"],
                RowType::Subtotal,
                "Total Consumer Staples",
                100,
            ),
        ];
        let tree = build_tree(&rows);
        assert!(tree
            .issues
            .iter()
            .any(|i| i.code == IssueCode::SubtotalPathMismatch));
    }

    #[test]
    fn boilerplate_labels_do_not_mismatch() {
        let rows = vec![
            holding(&["Fund", "Energy"], "x", 100),
            aggregate(&["Fund", "Energy"], RowType::Subtotal, "Total investments, at value", 100),
        ];
        let tree = build_tree(&rows);
        assert!(!tree
            .issues
            .iter()
            .any(|i| i.code == IssueCode::SubtotalPathMismatch));
    }

    #[test]
    fn grand_total_attaches_at_root() {
        let rows = vec![
            holding(&["A"], "x", 100),
            aggregate(&[], RowType::GrandTotal, "Total net assets", 100),
        ];
        let tree = build_tree(&rows);
        assert_eq!(tree.grand_total, Some(1));
    }

    #[test]
    fn rows_without_type_are_skipped() {
        let rows = vec![Row {
            section_path: vec!["A".into()],
            investment: Some("mystery".into()),
            ..Row::default()
        }];
        let tree = build_tree(&rows);
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.subtree_holding_count(0), 0);
    }
}
