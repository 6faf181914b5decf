//! High-level notebook operations over a SQLite database.

use crate::core::export::{render_export, select_nodes, ExportOptions};
use crate::core::search::search_nodes;
use crate::core::tree::build_forest;
use crate::{
    DeleteResult, Image, ImageInfo, NewImage, NewNode, Node, NodeUpdate, NotebookConfig,
    NotebookError, RepairReport, Result, SearchResult, Storage, TreeNode,
};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

const SELECT_NODE: &str = "SELECT id, parent_id, title, content, is_folder, position, created_at, updated_at
     FROM documents";

/// Every id in the subtree rooted at `?1`, the root first. `UNION` keeps the
/// walk finite even if the stored relation contains a cycle.
const SUBTREE_IDS: &str = "WITH RECURSIVE subtree(id) AS (
         SELECT ?1
         UNION
         SELECT d.id FROM documents d JOIN subtree s ON d.parent_id = s.id
     )
     SELECT id FROM subtree";

/// An open notebook backed by a SQLite database.
///
/// `Notebook` is the only way to read or write nodes. Every mutating method
/// runs inside a single SQLite transaction, so a failure part-way through
/// (for example during a cascading delete) leaves the database unchanged.
/// Reads re-query the database each time; nothing is cached.
pub struct Notebook {
    storage: Storage,
}

impl Notebook {
    /// Opens (or creates) the notebook database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::Database`] if the file is not a usable SQLite
    /// database, or [`NotebookError::Io`] if its directory cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::debug!("opening notebook at {}", path.as_ref().display());
        Ok(Self {
            storage: Storage::open(path)?,
        })
    }

    /// Opens the database named by `config`.
    pub fn open_with(config: &NotebookConfig) -> Result<Self> {
        Self::open(&config.database_path)
    }

    /// Opens a throwaway in-memory notebook.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            storage: Storage::open_in_memory()?,
        })
    }

    /// Returns the underlying SQLite connection.
    pub fn connection(&self) -> &Connection {
        self.storage.connection()
    }

    /// Fetches a single node by id.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::NodeNotFound`] if no node has this id.
    pub fn get_node(&self, id: i64) -> Result<Node> {
        fetch_node(self.connection(), id)
    }

    /// Returns every node ordered by `(position, id)`.
    pub fn list_nodes(&self) -> Result<Vec<Node>> {
        let mut stmt = self
            .connection()
            .prepare(&format!("{SELECT_NODE} ORDER BY position, id"))?;
        let nodes = stmt
            .query_map([], map_node_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(nodes)
    }

    pub fn count_nodes(&self) -> Result<usize> {
        let count: i64 = self
            .connection()
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Creates a node and returns it as stored.
    ///
    /// A non-positive or unknown `parent_id` is stored as `NULL` (root). That
    /// includes the id the new node is about to receive, which does not exist
    /// yet when the parent is resolved; the post-insert check only backs this up.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::Database`] for any SQLite failure.
    pub fn create_node(&mut self, new: NewNode) -> Result<Node> {
        let now = chrono::Utc::now().timestamp();
        let tx = self.storage.connection_mut().transaction()?;

        let parent_id = resolve_parent(&tx, new.parent_id)?;
        tx.execute(
            "INSERT INTO documents (parent_id, title, content, is_folder, position, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            rusqlite::params![parent_id, new.title, new.content, new.is_folder, now],
        )?;
        let id = tx.last_insert_rowid();

        if parent_id == Some(id) {
            log::warn!("node {id} was created as its own parent; moving it to the root");
            tx.execute(
                "UPDATE documents SET parent_id = NULL WHERE id = ?1",
                rusqlite::params![id],
            )?;
        }

        let node = fetch_node(&tx, id)?;
        tx.commit()?;

        log::debug!("created node {} under {:?}", node.id, node.parent_id);
        Ok(node)
    }

    /// Applies a partial update and returns the stored node.
    ///
    /// Only fields present in `update` change. A parent equal to the node
    /// itself, non-positive, or unknown is stored as `NULL`. `updated_at` is
    /// refreshed whenever at least one field is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::NodeNotFound`] if `id` does not exist, and
    /// [`NotebookError::InvalidMove`] if the new parent is one of the node's
    /// own descendants. Nothing is written in either case.
    pub fn update_node(&mut self, id: i64, update: NodeUpdate) -> Result<Node> {
        let tx = self.storage.connection_mut().transaction()?;
        let mut node = fetch_node(&tx, id)?;

        if update.is_empty() {
            return Ok(node);
        }

        if let Some(title) = update.title {
            node.title = title;
        }
        if let Some(content) = update.content {
            node.content = content;
        }
        if let Some(position) = update.position {
            node.position = position;
        }
        if let Some(requested) = update.parent_id {
            node.parent_id = match requested {
                Some(parent_id) if parent_id == id => {
                    log::warn!("node {id} cannot be its own parent; moving it to the root");
                    None
                }
                other => resolve_parent(&tx, other)?,
            };
            if let Some(parent_id) = node.parent_id {
                if is_within_subtree(&tx, parent_id, id)? {
                    return Err(NotebookError::InvalidMove(
                        "Move would create a cycle".to_string(),
                    ));
                }
            }
        }

        let now = chrono::Utc::now().timestamp();
        node.updated_at = Some(now);
        tx.execute(
            "UPDATE documents
             SET title = ?1, content = ?2, parent_id = ?3, position = ?4, updated_at = ?5
             WHERE id = ?6",
            rusqlite::params![node.title, node.content, node.parent_id, node.position, now, id],
        )?;
        tx.commit()?;

        log::debug!("updated node {id}");
        Ok(node)
    }

    /// Deletes `id`, every descendant and every image they own.
    ///
    /// Nodes are removed leaves-first inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::NodeNotFound`] if `id` does not exist, or
    /// [`NotebookError::Database`] for any SQLite failure. The transaction is
    /// rolled back automatically on any failure.
    pub fn delete_node(&mut self, id: i64) -> Result<DeleteResult> {
        let tx = self.storage.connection_mut().transaction()?;
        fetch_node(&tx, id)?;

        let deleted_ids: Vec<i64> = {
            let mut stmt = tx.prepare(SUBTREE_IDS)?;
            let ids = stmt
                .query_map(rusqlite::params![id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };

        let mut images_deleted = 0;
        for node_id in deleted_ids.iter().rev() {
            images_deleted += tx.execute(
                "DELETE FROM images WHERE document_id = ?1",
                rusqlite::params![node_id],
            )?;
            tx.execute("DELETE FROM documents WHERE id = ?1", rusqlite::params![node_id])?;
        }

        tx.commit()?;

        log::info!(
            "deleted node {id} with {} descendant(s) and {images_deleted} image(s)",
            deleted_ids.len() - 1
        );
        Ok(DeleteResult {
            deleted_count: deleted_ids.len(),
            deleted_ids,
            images_deleted,
        })
    }

    /// Removes every node and every image. This cannot be undone.
    pub fn delete_all(&mut self) -> Result<DeleteResult> {
        let tx = self.storage.connection_mut().transaction()?;

        let deleted_ids: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM documents ORDER BY id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };
        let images_deleted = tx.execute("DELETE FROM images", [])?;
        tx.execute("DELETE FROM documents", [])?;

        tx.commit()?;

        log::info!(
            "deleted all {} node(s) and {images_deleted} image(s)",
            deleted_ids.len()
        );
        Ok(DeleteResult {
            deleted_count: deleted_ids.len(),
            deleted_ids,
            images_deleted,
        })
    }

    /// Assembles the ordered forest of all nodes.
    pub fn tree(&self) -> Result<Vec<TreeNode>> {
        Ok(build_forest(&self.list_nodes()?))
    }

    /// Finds nodes whose title or plain-text body contains `query`, ignoring case.
    ///
    /// An empty query returns an empty result without reading the database.
    pub fn search(&self, query: &str) -> Result<SearchResult> {
        if query.is_empty() {
            return Ok(SearchResult::default());
        }
        let result = search_nodes(&self.list_nodes()?, query);
        if result.is_empty() {
            log::debug!("search for {query:?} matched nothing");
            return Ok(result);
        }
        log::debug!(
            "search matched {} node(s) with {} ancestor(s)",
            result.matches.len(),
            result.ancestors.len()
        );
        Ok(result)
    }

    /// Exports every node to one Markdown document.
    pub fn export_markdown(&self) -> Result<String> {
        self.export_markdown_with(&ExportOptions::default())
    }

    /// Exports the nodes selected by `options` to one Markdown document.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::NodeNotFound`] if `options.root` does not exist,
    /// or [`NotebookError::Conversion`] if a body cannot be converted.
    pub fn export_markdown_with(&self, options: &ExportOptions) -> Result<String> {
        let nodes = self.list_nodes()?;
        let selected = select_nodes(&nodes, options)?;
        log::info!("exporting {} of {} node(s)", selected.len(), nodes.len());
        render_export(&selected)
    }

    /// Writes the export selected by `options` to `path`.
    pub fn export_to_file<P: AsRef<Path>>(&self, path: P, options: &ExportOptions) -> Result<()> {
        let markdown = self.export_markdown_with(options)?;
        std::fs::write(path, markdown)?;
        Ok(())
    }

    // ── Images ──────────────────────────────────────────────────

    /// Attaches an image to `node_id`.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::NodeNotFound`] if `node_id` does not exist.
    pub fn add_image(&mut self, node_id: i64, image: NewImage) -> Result<ImageInfo> {
        let tx = self.storage.connection_mut().transaction()?;
        fetch_node(&tx, node_id)?;
        tx.execute(
            "INSERT INTO images (document_id, filename, content_type, data) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![node_id, image.filename, image.content_type, image.data],
        )?;
        let stored = Image {
            id: tx.last_insert_rowid(),
            node_id,
            filename: image.filename,
            content_type: image.content_type,
            data: image.data,
        };
        tx.commit()?;

        Ok(stored.info())
    }

    /// Fetches an image including its payload.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::ImageNotFound`] if no image has this id.
    pub fn get_image(&self, id: i64) -> Result<Image> {
        self.connection()
            .query_row(
                "SELECT id, document_id, filename, content_type, data FROM images WHERE id = ?1",
                rusqlite::params![id],
                |row| {
                    Ok(Image {
                        id: row.get(0)?,
                        node_id: row.get(1)?,
                        filename: row.get(2)?,
                        content_type: row.get(3)?,
                        data: row.get(4)?,
                    })
                },
            )
            .optional()?
            .ok_or(NotebookError::ImageNotFound(id))
    }

    /// Lists the images attached to `node_id`, oldest first.
    pub fn list_images(&self, node_id: i64) -> Result<Vec<ImageInfo>> {
        fetch_node(self.connection(), node_id)?;
        let mut stmt = self.connection().prepare(
            "SELECT id, document_id, filename, content_type FROM images
             WHERE document_id = ?1 ORDER BY id",
        )?;
        let images = stmt
            .query_map(rusqlite::params![node_id], |row| {
                Ok(ImageInfo {
                    id: row.get(0)?,
                    node_id: row.get(1)?,
                    filename: row.get(2)?,
                    content_type: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(images)
    }

    // ── Maintenance ─────────────────────────────────────────────

    /// Moves every node with a broken parent link to the root.
    ///
    /// Self-references and references to missing nodes are cleared first. Any
    /// node still unreachable from a root is then part of a parent cycle; each
    /// cycle is broken by detaching its lowest id.
    pub fn repair_links(&mut self) -> Result<RepairReport> {
        let tx = self.storage.connection_mut().transaction()?;

        let self_references_fixed = tx.execute(
            "UPDATE documents SET parent_id = NULL WHERE parent_id = id",
            [],
        )?;
        let orphans_fixed = tx.execute(
            "UPDATE documents SET parent_id = NULL
             WHERE parent_id IS NOT NULL AND parent_id NOT IN (SELECT id FROM documents)",
            [],
        )?;

        let mut cycles_broken = 0;
        loop {
            let nodes = {
                let mut stmt = tx.prepare(&format!("{SELECT_NODE} ORDER BY position, id"))?;
                let nodes = stmt
                    .query_map([], map_node_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                nodes
            };
            let reachable: HashSet<i64> = build_forest(&nodes)
                .iter()
                .flat_map(|root| root.preorder_ids())
                .collect();
            let Some(stuck) = nodes.iter().map(|n| n.id).filter(|id| !reachable.contains(id)).min()
            else {
                break;
            };
            tx.execute(
                "UPDATE documents SET parent_id = NULL WHERE id = ?1",
                rusqlite::params![stuck],
            )?;
            cycles_broken += 1;
        }

        tx.commit()?;

        let report = RepairReport {
            self_references_fixed,
            orphans_fixed,
            cycles_broken,
        };
        log::info!(
            "repaired links: {} self-reference(s), {} orphan(s), {} cycle(s)",
            report.self_references_fixed,
            report.orphans_fixed,
            report.cycles_broken
        );
        Ok(report)
    }
}

fn map_node_row(row: &rusqlite::Row) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        is_folder: row.get(4)?,
        position: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn fetch_node(conn: &Connection, id: i64) -> Result<Node> {
    conn.query_row(
        &format!("{SELECT_NODE} WHERE id = ?1"),
        rusqlite::params![id],
        map_node_row,
    )
    .optional()?
    .ok_or(NotebookError::NodeNotFound(id))
}

/// Returns the parent id to store for a requested parent reference.
///
/// Non-positive and unknown ids become `None` instead of failing the write.
fn resolve_parent(conn: &Connection, requested: Option<i64>) -> Result<Option<i64>> {
    let Some(parent_id) = requested else {
        return Ok(None);
    };
    if parent_id <= 0 {
        log::warn!("parent reference {parent_id} is not a valid id; using root");
        return Ok(None);
    }
    let exists = conn
        .query_row(
            "SELECT 1 FROM documents WHERE id = ?1",
            rusqlite::params![parent_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !exists {
        log::warn!("parent {parent_id} does not exist; using root");
        return Ok(None);
    }
    Ok(Some(parent_id))
}

/// Walks up from `candidate` and reports whether `root` is on the path.
fn is_within_subtree(conn: &Connection, candidate: i64, root: i64) -> Result<bool> {
    let mut seen = HashSet::new();
    let mut current = Some(candidate);
    while let Some(id) = current {
        if id == root {
            return Ok(true);
        }
        if !seen.insert(id) {
            break;
        }
        current = conn
            .query_row(
                "SELECT parent_id FROM documents WHERE id = ?1",
                rusqlite::params![id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
    }
    Ok(false)
}
