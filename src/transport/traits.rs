use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{ChatRequestBody, StreamEvent, TransportError};
use crate::models::Attachment;

/// Network operations the chat pipeline depends on. The orchestrator only
/// sees this trait, so tests and alternative backends plug in freely.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open the chat stream for `request` and forward decoded text chunks
    /// through `tx` in arrival order, terminated by `Done` or `Error`.
    /// Fails fast (before any chunk) on validation or a non-2xx status.
    async fn send_chat(
        &self,
        request: ChatRequestBody,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), TransportError>;

    /// Upload any attachments that still lack a server-durable url and
    /// return the full list in durable form.
    async fn upload_attachments(
        &self,
        attachments: Vec<Attachment>,
    ) -> Result<Vec<Attachment>, TransportError>;
}
