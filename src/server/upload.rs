use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::json;
use uuid::Uuid;

use super::AppState;
use crate::transport::types::{UploadResponse, UploadedFile};

pub struct IncomingFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

pub struct StoredFile {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Where accepted uploads go. The disk and proxy variants have different
/// semantics and stay separate implementations behind this seam.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    async fn store_files(&self, files: Vec<IncomingFile>) -> Result<Vec<UploadedFile>>;

    /// Retrieve a previously stored file. Only disk-backed stores can serve
    /// files; the proxy returns `None`.
    async fn open(&self, name: &str) -> Option<StoredFile>;
}

/// Saves uploads under a local directory as `{uuid}{ext}`.
pub struct DiskBackend {
    dir: PathBuf,
}

impl DiskBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl UploadBackend for DiskBackend {
    async fn store_files(&self, files: Vec<IncomingFile>) -> Result<Vec<UploadedFile>> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            let id = Uuid::new_v4().to_string();
            let ext = Path::new(&file.name)
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            let file_name = format!("{}{}", id, ext);
            let path = self.dir.join(&file_name);
            tokio::fs::write(&path, &file.data)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;

            stored.push(UploadedFile {
                id,
                name: file_name.clone(),
                mime_type: file.mime_type,
                size: file.data.len() as u64,
                url: format!("/api/uploads/{}", file_name),
            });
        }
        Ok(stored)
    }

    async fn open(&self, name: &str) -> Option<StoredFile> {
        // Stored names are flat uuid-based file names; anything that could
        // escape the directory is rejected outright.
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return None;
        }
        let path = self.dir.join(name);
        let data = tokio::fs::read(&path).await.ok()?;
        Some(StoredFile {
            data,
            mime_type: mime_for(name).to_string(),
        })
    }
}

/// Forwards uploads to an external storage service and relays its
/// descriptors. The upstream responds with a bare file array.
pub struct ProxyBackend {
    client: reqwest::Client,
    upstream: String,
}

impl ProxyBackend {
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upstream: upstream.into(),
        }
    }
}

#[async_trait]
impl UploadBackend for ProxyBackend {
    async fn store_files(&self, files: Vec<IncomingFile>) -> Result<Vec<UploadedFile>> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.data.to_vec())
                .file_name(file.name.clone())
                .mime_str(&file.mime_type)
                .with_context(|| format!("invalid mime type for {}", file.name))?;
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(&self.upstream)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("upstream {} unreachable", self.upstream))?;

        if !response.status().is_success() {
            bail!("upstream returned HTTP {}", response.status().as_u16());
        }

        let files: Vec<UploadedFile> = response
            .json()
            .await
            .context("upstream returned an invalid file list")?;
        Ok(files)
    }

    async fn open(&self, _name: &str) -> Option<StoredFile> {
        None
    }
}

fn mime_for(name: &str) -> &'static str {
    match Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
        .as_str()
    {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// `POST /api/upload`: accept `files` multipart fields, hand them to the
/// configured backend, and echo the durable descriptors.
pub async fn upload_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut files = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("files") {
                    continue;
                }
                let name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                match field.bytes().await {
                    Ok(data) => files.push(IncomingFile {
                        name,
                        mime_type,
                        data,
                    }),
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "error": e.to_string() })),
                        )
                            .into_response()
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        }
    }

    if files.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No files provided" })),
        )
            .into_response();
    }

    match state.uploads.store_files(files).await {
        Ok(stored) => Json(UploadResponse { files: stored }).into_response(),
        Err(e) => {
            tracing::error!("upload failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to upload files" })),
            )
                .into_response()
        }
    }
}

/// `GET /api/uploads/{name}`: serve a stored file.
pub async fn stored_file_handler(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> Response {
    match state.uploads.open(&name).await {
        Some(file) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, file.mime_type)],
            file.data,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disk_backend_stores_with_uuid_name() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());

        let stored = backend
            .store_files(vec![IncomingFile {
                name: "report.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                data: Bytes::from_static(b"%PDF-1.4"),
            }])
            .await
            .unwrap();

        assert_eq!(stored.len(), 1);
        let file = &stored[0];
        assert!(file.name.ends_with(".pdf"));
        assert_ne!(file.name, "report.pdf");
        assert_eq!(file.size, 8);
        assert_eq!(file.url, format!("/api/uploads/{}", file.name));
        assert!(dir.path().join(&file.name).exists());
    }

    #[tokio::test]
    async fn test_disk_backend_serves_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());

        let stored = backend
            .store_files(vec![IncomingFile {
                name: "note.txt".to_string(),
                mime_type: "text/plain".to_string(),
                data: Bytes::from_static(b"hello"),
            }])
            .await
            .unwrap();

        let file = backend.open(&stored[0].name).await.unwrap();
        assert_eq!(file.data, b"hello");
        assert_eq!(file.mime_type, "text/plain");
    }

    #[tokio::test]
    async fn test_disk_backend_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"hidden").unwrap();
        let backend = DiskBackend::new(dir.path().join("uploads"));

        assert!(backend.open("../secret.txt").await.is_none());
        assert!(backend.open("..\\secret.txt").await.is_none());
        assert!(backend.open("a/b.txt").await.is_none());
    }

    #[test]
    fn test_mime_for_common_extensions() {
        assert_eq!(mime_for("photo.PNG"), "image/png");
        assert_eq!(mime_for("doc.pdf"), "application/pdf");
        assert_eq!(mime_for("archive.tar.gz"), "application/octet-stream");
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }
}
