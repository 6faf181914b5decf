//! Node records and the write payloads that create and patch them.

use serde::{Deserialize, Deserializer, Serialize};

/// A document or folder stored in the `documents` relation.
///
/// Parent links are stored as ids; children are never persisted and are only
/// materialised by the tree assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub is_folder: bool,
    pub position: i32,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

/// Payload for [`Notebook::create_node`](crate::Notebook::create_node).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub is_folder: bool,
}

impl NewNode {
    /// A root-level document with an empty body.
    pub fn document(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// A root-level folder.
    pub fn folder(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            is_folder: true,
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// Partial update for [`Notebook::update_node`](crate::Notebook::update_node).
///
/// `None` leaves a field untouched. `parent_id` is tri-state: `None` leaves the
/// parent alone, `Some(None)` moves the node to the root, `Some(Some(id))`
/// re-parents it. When deserializing, an explicit JSON `null` maps to
/// `Some(None)` while a missing key maps to `None`.
///
/// # Examples
///
/// ```rust
/// use notebook_core::NodeUpdate;
///
/// let absent: NodeUpdate = serde_json::from_str(r#"{"title": "Renamed"}"#).unwrap();
/// assert_eq!(absent.parent_id, None);
///
/// let cleared: NodeUpdate = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
/// assert_eq!(cleared.parent_id, Some(None));
///
/// let moved: NodeUpdate = serde_json::from_str(r#"{"parent_id": 4}"#).unwrap();
/// assert_eq!(moved.parent_id, Some(Some(4)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

impl NodeUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Re-parents the node; `None` moves it to the root.
    pub fn parent(parent_id: Option<i64>) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.parent_id.is_none()
            && self.position.is_none()
    }
}

// Only called when the key is present, so `null` becomes `Some(None)`.
fn present_or_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}
