//! Internal domain modules for the Notebook core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod config;
pub mod delete;
pub mod error;
pub mod export;
pub mod image;
pub mod markdown;
pub mod node;
pub mod notebook;
pub mod plain_text;
pub mod search;
pub mod storage;
pub mod tree;

#[doc(inline)]
pub use config::NotebookConfig;
#[doc(inline)]
pub use delete::{DeleteResult, RepairReport};
#[doc(inline)]
pub use error::{ErrorKind, NotebookError, Result};
#[doc(inline)]
pub use export::{ExportOptions, EXPORT_FILENAME, EXPORT_MEDIA_TYPE};
#[doc(inline)]
pub use image::{Image, ImageInfo, NewImage};
#[doc(inline)]
pub use markdown::convert_body;
#[doc(inline)]
pub use node::{NewNode, Node, NodeUpdate};
#[doc(inline)]
pub use notebook::Notebook;
#[doc(inline)]
pub use plain_text::project;
#[doc(inline)]
pub use search::SearchResult;
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use tree::TreeNode;
