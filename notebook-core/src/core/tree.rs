//! Reconstruction of the ordered forest from the flat `documents` relation.

use crate::Node;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Lightweight view of a node inside an assembled tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: i64,
    pub title: String,
    pub is_folder: bool,
    pub parent_id: Option<i64>,
    pub position: i32,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Returns this node's id followed by every descendant id, depth-first in
    /// sibling order.
    pub fn preorder_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.push(node.id);
            stack.extend(node.children.iter().rev());
        }
        ids
    }

    /// Finds `id` in this subtree.
    pub fn find(&self, id: i64) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Finds `id` anywhere in `forest`.
pub fn find_in_forest(forest: &[TreeNode], id: i64) -> Option<&TreeNode> {
    forest.iter().find_map(|root| root.find(id))
}

/// Builds the forest of root [`TreeNode`]s from a flat slice of nodes.
///
/// Siblings are ordered by `(position, id)` regardless of input order, so the
/// output depends only on the stored state. A node whose parent is missing is
/// dropped together with its subtree; nodes caught in a parent cycle are
/// unreachable from any root and are dropped the same way.
pub fn build_forest(nodes: &[Node]) -> Vec<TreeNode> {
    let mut ordered: Vec<&Node> = nodes.iter().collect();
    ordered.sort_by_key(|n| (n.position, n.id));

    let known: HashSet<i64> = ordered.iter().map(|n| n.id).collect();
    let mut roots = Vec::new();
    let mut children: HashMap<i64, Vec<&Node>> = HashMap::new();

    for node in ordered {
        match node.parent_id {
            None => roots.push(node),
            Some(parent_id) if known.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(node);
            }
            Some(parent_id) => {
                log::warn!("dropping orphan node {} (parent {} missing)", node.id, parent_id);
            }
        }
    }

    roots
        .into_iter()
        .map(|root| assemble(root, &children))
        .collect()
}

fn assemble(node: &Node, children: &HashMap<i64, Vec<&Node>>) -> TreeNode {
    TreeNode {
        id: node.id,
        title: node.title.clone(),
        is_folder: node.is_folder,
        parent_id: node.parent_id,
        position: node.position,
        children: children
            .get(&node.id)
            .map(|kids| kids.iter().map(|kid| assemble(kid, children)).collect())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, parent_id: Option<i64>, position: i32) -> Node {
        Node {
            id,
            parent_id,
            title: format!("Node {id}"),
            content: String::new(),
            is_folder: false,
            position,
            created_at: 0,
            updated_at: None,
        }
    }

    fn assert_sibling_order(nodes: &[TreeNode]) {
        for pair in nodes.windows(2) {
            assert!(
                (pair[0].position, pair[0].id) <= (pair[1].position, pair[1].id),
                "siblings out of order: {} before {}",
                pair[0].id,
                pair[1].id
            );
        }
        for n in nodes {
            assert_sibling_order(&n.children);
        }
    }

    #[test]
    fn test_build_forest_empty() {
        assert!(build_forest(&[]).is_empty());
    }

    #[test]
    fn test_build_forest_nests_children() {
        let nodes = vec![node(1, None, 0), node(2, Some(1), 0), node(3, Some(2), 0)];
        let forest = build_forest(&nodes);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, 1);
        assert_eq!(forest[0].children[0].id, 2);
        assert_eq!(forest[0].children[0].children[0].id, 3);
    }

    #[test]
    fn test_build_forest_orders_by_position_then_id() {
        let nodes = vec![
            node(5, None, 1),
            node(4, None, 0),
            node(3, None, 1),
            node(10, Some(4), 2),
            node(11, Some(4), 0),
            node(9, Some(4), 0),
        ];
        let forest = build_forest(&nodes);

        let root_ids: Vec<i64> = forest.iter().map(|n| n.id).collect();
        assert_eq!(root_ids, vec![4, 3, 5]);
        let child_ids: Vec<i64> = forest[0].children.iter().map(|n| n.id).collect();
        assert_eq!(child_ids, vec![9, 11, 10]);
        assert_sibling_order(&forest);
    }

    #[test]
    fn test_build_forest_child_sorted_before_parent() {
        // The child sorts ahead of its parent; it must still be attached.
        let nodes = vec![node(1, None, 5), node(2, Some(1), 0)];
        let forest = build_forest(&nodes);
        assert_eq!(forest[0].children.len(), 1);
    }

    #[test]
    fn test_build_forest_drops_orphans_with_subtree() {
        let nodes = vec![node(1, None, 0), node(2, Some(99), 0), node(3, Some(2), 0)];
        let forest = build_forest(&nodes);

        assert_eq!(forest.len(), 1);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_build_forest_terminates_on_cycle() {
        let nodes = vec![node(1, None, 0), node(2, Some(3), 0), node(3, Some(2), 0), node(4, Some(4), 0)];
        let forest = build_forest(&nodes);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].preorder_ids(), vec![1]);
    }

    #[test]
    fn test_build_forest_is_deterministic() {
        let nodes = vec![node(3, Some(1), 0), node(1, None, 0), node(2, Some(1), 0)];
        let mut reversed = nodes.clone();
        reversed.reverse();

        assert_eq!(build_forest(&nodes), build_forest(&nodes));
        assert_eq!(build_forest(&nodes), build_forest(&reversed));
    }

    #[test]
    fn test_preorder_and_find() {
        let nodes = vec![
            node(1, None, 0),
            node(2, Some(1), 0),
            node(3, Some(2), 0),
            node(4, Some(1), 1),
            node(5, None, 1),
        ];
        let forest = build_forest(&nodes);

        assert_eq!(forest[0].preorder_ids(), vec![1, 2, 3, 4]);
        assert_eq!(find_in_forest(&forest, 3).map(|n| n.id), Some(3));
        assert_eq!(find_in_forest(&forest, 5).map(|n| n.children.len()), Some(0));
        assert!(find_in_forest(&forest, 42).is_none());
    }
}
