//! Binary image attachments owned by a single node.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// A stored image including its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub id: i64,
    pub node_id: i64,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Image {
    /// Renders the payload as a `data:` URI for embedding in rich text.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            id: self.id,
            node_id: self.node_id,
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
        }
    }
}

/// Image metadata without the payload, as returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: i64,
    pub node_id: i64,
    pub filename: String,
    pub content_type: String,
}

/// Payload for [`Notebook::add_image`](crate::Notebook::add_image).
#[derive(Debug, Clone)]
pub struct NewImage {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}
