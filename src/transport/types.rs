use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Attachment, ContextItem, ContextSet};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Empty message with no attachments")]
    Validation,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Model descriptor as it travels on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRef {
    pub id: String,
    pub name: String,
}

/// Attachment form sent to the chat endpoint: durable fields only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAttachment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub url: String,
}

impl From<&Attachment> for RequestAttachment {
    fn from(attachment: &Attachment) -> Self {
        Self {
            id: attachment.id.clone(),
            name: attachment.name.clone(),
            mime_type: attachment.mime_type.clone(),
            url: attachment.url.clone(),
        }
    }
}

/// JSON body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<RequestAttachment>,
    #[serde(rename = "contextItems", default, skip_serializing_if = "Vec::is_empty")]
    pub context_items: Vec<ContextItem>,
    pub model: ModelRef,
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    #[serde(rename = "projectContext", default, skip_serializing_if = "Option::is_none")]
    pub project_context: Option<ContextSet>,
}

impl ChatRequestBody {
    /// A request with neither text nor attachments is rejected before any
    /// network call is made.
    pub fn is_empty(&self) -> bool {
        self.message.trim().is_empty() && self.attachments.is_empty()
    }
}

/// One entry of the upload endpoint's response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

/// Incremental events produced while consuming a chat response body.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Chunk(String),
    Done,
    Error(String),
}
