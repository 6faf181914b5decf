//! Case-insensitive substring search with ancestor expansion.

use crate::{project, Node};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Ids of matching nodes, plus the ids of their non-matching ancestors.
///
/// Both lists are sorted ascending and disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub matches: Vec<i64>,
    pub ancestors: Vec<i64>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.ancestors.is_empty()
    }
}

/// Matches `query` against every node's title and projected body.
///
/// An empty query yields an empty result. The upward walk from each match
/// stops at a root, at a missing parent, or at an id it has already seen.
pub fn search_nodes(nodes: &[Node], query: &str) -> SearchResult {
    if query.is_empty() {
        return SearchResult::default();
    }
    let needle = query.to_lowercase();

    let matches: BTreeSet<i64> = nodes
        .iter()
        .filter(|node| {
            node.title.to_lowercase().contains(&needle) || project(&node.content).contains(&needle)
        })
        .map(|node| node.id)
        .collect();

    let parents: HashMap<i64, Option<i64>> =
        nodes.iter().map(|node| (node.id, node.parent_id)).collect();

    let mut ancestors = BTreeSet::new();
    for &id in &matches {
        let mut seen = HashSet::from([id]);
        let mut current = parents.get(&id).copied().flatten();
        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            ancestors.insert(parent_id);
            current = parents.get(&parent_id).copied().flatten();
        }
    }

    SearchResult {
        ancestors: ancestors.difference(&matches).copied().collect(),
        matches: matches.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, parent_id: Option<i64>, title: &str, content: &str) -> Node {
        Node {
            id,
            parent_id,
            title: title.to_string(),
            content: content.to_string(),
            is_folder: false,
            position: 0,
            created_at: 0,
            updated_at: None,
        }
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let nodes = vec![node(1, None, "Anything", "")];
        assert!(search_nodes(&nodes, "").is_empty());
    }

    #[test]
    fn test_match_with_ancestor_path() {
        let nodes = vec![
            node(1, None, "Alpha", ""),
            node(2, Some(1), "Beta", ""),
            node(3, Some(2), "Needle here", ""),
        ];
        let result = search_nodes(&nodes, "needle");

        assert_eq!(result.matches, vec![3]);
        assert_eq!(result.ancestors, vec![1, 2]);
    }

    #[test]
    fn test_matching_ancestor_is_not_repeated() {
        let nodes = vec![
            node(1, None, "needle root", ""),
            node(2, Some(1), "Middle", ""),
            node(3, Some(2), "needle leaf", ""),
        ];
        let result = search_nodes(&nodes, "NEEDLE");

        assert_eq!(result.matches, vec![1, 3]);
        assert_eq!(result.ancestors, vec![2]);
    }

    #[test]
    fn test_matches_projected_body_not_markup() {
        let nodes = vec![
            node(1, None, "One", "<p>Quarterly <b>Report</b></p>"),
            node(2, None, "Two", r#"<img src="data:image/png;base64,cmVwb3J0">"#),
            node(3, None, "Three", "<strong>bold</strong>"),
        ];

        assert_eq!(search_nodes(&nodes, "quarterly report").matches, vec![1]);
        assert!(search_nodes(&nodes, "cmVwb3J0").matches.is_empty());
        assert!(search_nodes(&nodes, "strong").matches.is_empty());
    }

    #[test]
    fn test_walk_stops_on_cycle_and_missing_parent() {
        let nodes = vec![
            node(1, Some(2), "needle", ""),
            node(2, Some(1), "loop", ""),
            node(3, Some(77), "needle orphan", ""),
        ];
        let result = search_nodes(&nodes, "needle");

        assert_eq!(result.matches, vec![1, 3]);
        assert_eq!(result.ancestors, vec![2, 77]);
    }
}
