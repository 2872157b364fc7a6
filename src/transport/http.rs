use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::stream::read_text_stream;
use super::traits::ChatTransport;
use super::types::{ChatRequestBody, StreamEvent, TransportError, UploadResponse, UploadedFile};
use crate::models::Attachment;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Transport Client backed by the HTTP API (`/chat`, `/upload` relative to
/// a base url).
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Transport pointed at the configured API base url.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.api_base_url.as_str())
    }

    fn parse_error_message(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
            return format!("HTTP {}: {}", status.as_u16(), parsed.error);
        }
        format!("HTTP {}: Request failed", status.as_u16())
    }

    fn resolved_attachment(file: UploadedFile) -> Attachment {
        let preview_url = file
            .mime_type
            .starts_with("image/")
            .then(|| file.url.clone());
        Attachment {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            url: file.url,
            preview_url,
            local_path: None,
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_chat(
        &self,
        request: ChatRequestBody,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), TransportError> {
        if request.is_empty() {
            return Err(TransportError::Validation);
        }

        let url = format!("{}/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Request(Self::parse_error_message(
                status, &body,
            )));
        }

        read_text_stream(response, tx).await;

        Ok(())
    }

    async fn upload_attachments(
        &self,
        attachments: Vec<Attachment>,
    ) -> Result<Vec<Attachment>, TransportError> {
        if !attachments.iter().any(Attachment::needs_upload) {
            return Ok(attachments);
        }

        let mut form = reqwest::multipart::Form::new();
        for attachment in attachments.iter().filter(|a| a.needs_upload()) {
            let path = attachment.local_path.as_ref().ok_or_else(|| {
                TransportError::Upload(format!("attachment {} has no local file", attachment.name))
            })?;
            let data = tokio::fs::read(path).await.map_err(|e| {
                TransportError::Upload(format!("failed to read {}: {}", path.display(), e))
            })?;
            let part = reqwest::multipart::Part::bytes(data)
                .file_name(attachment.name.clone())
                .mime_str(&attachment.mime_type)
                .map_err(|e| TransportError::Upload(e.to_string()))?;
            form = form.part("files", part);
        }

        let url = format!("{}/upload", self.base_url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Upload(Self::parse_error_message(
                status, &body,
            )));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Upload(e.to_string()))?;

        if parsed.files.is_empty() {
            return Err(TransportError::Upload(
                "no files were accepted by the server".to_string(),
            ));
        }

        // Stitch the durable descriptors back into input order.
        let mut uploaded = parsed.files.into_iter();
        let mut resolved = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            if attachment.needs_upload() {
                match uploaded.next() {
                    Some(file) => resolved.push(Self::resolved_attachment(file)),
                    None => {
                        tracing::warn!(
                            "server accepted fewer files than sent, dropping {}",
                            attachment.name
                        );
                    }
                }
            } else {
                resolved.push(attachment);
            }
        }

        Ok(resolved)
    }
}
