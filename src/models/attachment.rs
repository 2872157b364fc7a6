use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A file referenced by a message. Created client-side with a temporary id
/// and a local path, then replaced by the server-confirmed id/url after
/// upload. `local_path` never leaves the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub url: String,
    #[serde(rename = "previewUrl", default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip)]
    pub local_path: Option<PathBuf>,
}

impl Attachment {
    /// Attachment for a freshly selected local file, not yet uploaded.
    pub fn local(name: impl Into<String>, mime_type: impl Into<String>, path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            mime_type: mime_type.into(),
            url: String::new(),
            preview_url: None,
            local_path: Some(path),
        }
    }

    pub fn needs_upload(&self) -> bool {
        self.local_path.is_some() || self.url.is_empty()
    }
}
