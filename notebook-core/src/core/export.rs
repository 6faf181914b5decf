//! Bulk export of the node relation to a single annotated Markdown document.
//!
//! Layout of the document:
//!
//! ```text
//! <!-- notebook-bulk-export-v1 -->
//! # Notebook Export
//!
//! <!-- notebook-header-separator -->
//!
//! # <title>
//!
//! <!-- notebook-metadata: {"id": 1, "parent_id": null, "title": "<title>", "position": 0} -->
//!
//! <converted body>
//!
//! <!-- notebook-doc-separator -->
//! ```
//!
//! The node blocks repeat once per exported node. The metadata comment alone is
//! enough to rebuild the hierarchy and sibling order, whatever the body holds.

use crate::core::markdown::convert_body;
use crate::core::tree::{build_forest, find_in_forest};
use crate::{Node, NotebookError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;

/// Version marker on the first line of every export.
pub const EXPORT_HEADER: &str = "<!-- notebook-bulk-export-v1 -->";
pub const EXPORT_TITLE: &str = "# Notebook Export";
/// Ends the document header; distinct from [`DOC_SEPARATOR`].
pub const HEADER_SEPARATOR: &str = "<!-- notebook-header-separator -->";
/// Closes each node block.
pub const DOC_SEPARATOR: &str = "<!-- notebook-doc-separator -->";
pub const METADATA_PREFIX: &str = "<!-- notebook-metadata: ";
pub const METADATA_SUFFIX: &str = " -->";

/// File name offered when the export is delivered as an attachment.
pub const EXPORT_FILENAME: &str = "notebook_export.md";
pub const EXPORT_MEDIA_TYPE: &str = "text/markdown";

/// Selects which nodes an export covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Folders are exported like documents unless this is `false`.
    pub include_folders: bool,
    /// Restricts the export to this node and its descendants.
    pub root: Option<i64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_folders: true,
            root: None,
        }
    }
}

/// Per-node metadata written into the export as a JSON comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub position: i32,
}

impl From<&Node> for ExportMetadata {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            parent_id: node.parent_id,
            title: node.title.clone(),
            position: node.position,
        }
    }
}

/// Writes JSON with `", "` between members and `": "` after keys, on one line.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serializes `metadata` for the comment line.
///
/// `-->` inside a string value is written as `--\u003e` so the comment cannot
/// be closed early; JSON parsers read both spellings as the same text.
pub fn metadata_json(metadata: &ExportMetadata) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    metadata.serialize(&mut serializer)?;
    let json = String::from_utf8(buf).map_err(|e| NotebookError::Conversion(e.to_string()))?;
    Ok(json.replace("-->", "--\\u003e"))
}

/// Picks the nodes an export covers, in export order.
///
/// Without a root this is the `(position, id)` order of the whole relation.
/// With a root the subtree is walked depth-first in tree order.
///
/// # Errors
///
/// Returns [`NotebookError::NodeNotFound`] if `options.root` does not exist.
pub fn select_nodes<'a>(nodes: &'a [Node], options: &ExportOptions) -> Result<Vec<&'a Node>> {
    let selected: Vec<&Node> = match options.root {
        None => {
            let mut ordered: Vec<&Node> = nodes.iter().collect();
            ordered.sort_by_key(|n| (n.position, n.id));
            ordered
        }
        Some(root_id) => {
            let by_id: HashMap<i64, &Node> = nodes.iter().map(|n| (n.id, n)).collect();
            let root = by_id
                .get(&root_id)
                .copied()
                .ok_or(NotebookError::NodeNotFound(root_id))?;
            let forest = build_forest(nodes);
            match find_in_forest(&forest, root_id) {
                Some(subtree) => subtree
                    .preorder_ids()
                    .into_iter()
                    .filter_map(|id| by_id.get(&id).copied())
                    .collect(),
                // Detached from every root (orphan or cycle): export it alone.
                None => vec![root],
            }
        }
    };

    Ok(selected
        .into_iter()
        .filter(|n| options.include_folders || !n.is_folder)
        .collect())
}

/// Escapes every `<!--` in `text` as `&lt;!--`, so user text can never open a
/// comment that reads as a separator or metadata line.
pub fn neutralize_comments(text: &str) -> String {
    text.replace("<!--", "&lt;!--")
}

/// Renders one node block, separator included.
///
/// The title and converted body pass through [`neutralize_comments`]; only
/// the lines written here carry real marker comments.
///
/// # Errors
///
/// Returns [`NotebookError::Conversion`] if the body cannot be converted.
pub fn render_node(node: &Node) -> Result<String> {
    let title = neutralize_comments(&node.title.replace(['\r', '\n'], " "));
    let metadata = metadata_json(&ExportMetadata::from(node))?;
    let body = neutralize_comments(&convert_body(&node.content)?);

    let mut block = format!("# {title}\n\n{METADATA_PREFIX}{metadata}{METADATA_SUFFIX}\n\n");
    if !body.is_empty() {
        block.push_str(&body);
        block.push_str("\n\n");
    }
    block.push_str(DOC_SEPARATOR);
    block.push_str("\n\n");
    Ok(block)
}

/// Renders the complete export document for `nodes`, in the given order.
///
/// # Errors
///
/// Returns [`NotebookError::Conversion`] if any body cannot be converted.
pub fn render_export(nodes: &[&Node]) -> Result<String> {
    let mut out = format!("{EXPORT_HEADER}\n{EXPORT_TITLE}\n\n{HEADER_SEPARATOR}\n\n");
    for node in nodes {
        log::debug!("exporting node {}", node.id);
        out.push_str(&render_node(node)?);
    }
    Ok(out)
}
