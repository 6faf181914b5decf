//! Core library for Notebook, a hierarchical note-taking backend.
//!
//! The primary entry point is [`Notebook`], which represents an open SQLite
//! database. All node mutations go through `Notebook` methods.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    config::{NotebookConfig, DATABASE_PATH_ENV, DEFAULT_DATABASE_PATH},
    delete::{DeleteResult, RepairReport},
    error::{ErrorKind, NotebookError, Result},
    export::{ExportOptions, EXPORT_FILENAME, EXPORT_MEDIA_TYPE},
    image::{Image, ImageInfo, NewImage},
    markdown::convert_body,
    node::{NewNode, Node, NodeUpdate},
    notebook::Notebook,
    plain_text::project,
    search::SearchResult,
    storage::Storage,
    tree::TreeNode,
};
