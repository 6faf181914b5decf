//! Result types for destructive operations on a [`Notebook`](super::notebook::Notebook).
//!
//! Both types are serde-serializable so a presentation layer can return them
//! as-is. Fields serialize in camelCase (`deletedCount`, `deletedIds`,
//! `imagesDeleted`).
//!
//! ```rust
//! use notebook_core::DeleteResult;
//!
//! let result = DeleteResult {
//!     deleted_count: 2,
//!     deleted_ids: vec![4, 7],
//!     images_deleted: 1,
//! };
//! let json = serde_json::to_string(&result).unwrap();
//! assert!(json.contains("deletedCount"));
//! assert!(json.contains("imagesDeleted"));
//! ```

use serde::{Deserialize, Serialize};

/// The outcome of a cascading delete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// The total number of nodes that were permanently removed.
    pub deleted_count: usize,

    /// Ids of every removed node, the deleted root first.
    pub deleted_ids: Vec<i64>,

    /// Images removed along with their owning nodes.
    pub images_deleted: usize,
}

/// The outcome of [`Notebook::repair_links`](super::notebook::Notebook::repair_links).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    /// Nodes that named themselves as parent and were moved to the root.
    pub self_references_fixed: usize,

    /// Nodes whose parent no longer existed and were moved to the root.
    pub orphans_fixed: usize,

    /// Parent cycles broken by detaching one member.
    pub cycles_broken: usize,
}

impl RepairReport {
    pub fn total(&self) -> usize {
        self.self_references_fixed + self.orphans_fixed + self.cycles_broken
    }
}
