use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::transport::types::ChatRequestBody;

/// Pause after the acknowledgement chunk, simulating model warm-up.
const ACK_PAUSE_MS: u64 = 100;

pub struct ReplyChunk {
    pub delay_ms: u64,
    pub text: String,
}

/// The canned reply for a request, split into the chunks the endpoint
/// streams. Pure so the chunk content is testable without a server.
pub fn mock_reply_chunks(request: &ChatRequestBody) -> Vec<ReplyChunk> {
    let mut chunks = vec![ReplyChunk {
        delay_ms: 0,
        text: format!("I've received your message: \"{}\"", request.message),
    }];

    let mut context_names: Vec<String> = request
        .context_items
        .iter()
        .map(|item| item.name.clone())
        .collect();

    if let Some(project) = &request.project_context {
        if project.enabled {
            let project_names: Vec<String> = project
                .enabled_items()
                .map(|item| item.name.clone())
                .collect();
            if !project_names.is_empty() {
                if context_names.is_empty() {
                    context_names = vec![format!("project items: {}", project_names.join(", "))];
                } else {
                    let joined = context_names.join(", ");
                    context_names =
                        vec![format!("{}, and project items: {}", joined, project_names.join(", "))];
                }
            }
        }
    }

    if !context_names.is_empty() {
        chunks.push(ReplyChunk {
            delay_ms: 200,
            text: format!(
                "\n\nI'm considering the context: {}",
                context_names.join(", ")
            ),
        });
    }

    if !request.attachments.is_empty() {
        chunks.push(ReplyChunk {
            delay_ms: 150,
            text: format!(
                "\n\nI see you've attached {} file(s).",
                request.attachments.len()
            ),
        });
    }

    chunks.push(ReplyChunk {
        delay_ms: 300,
        text: "\n\nHere's my response based on your input. This is a simulated streaming \
               response from the API. In a real implementation, this would be replaced with \
               actual AI-generated content."
            .to_string(),
    });

    let model_id = if request.model.id.is_empty() {
        "GPT-3.5 Turbo".to_string()
    } else {
        request.model.id.clone()
    };
    chunks.push(ReplyChunk {
        delay_ms: 250,
        text: format!("\n\nThe model used for this response is {}.", model_id),
    });

    chunks
}

/// `POST /api/chat`: stream a canned reply as chunked plain text. The body
/// has no framing; clients append chunks verbatim.
pub async fn chat_handler(Json(request): Json<ChatRequestBody>) -> Response {
    if request.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Message or attachments required" })),
        )
            .into_response();
    }

    tracing::debug!(
        conversation_id = %request.conversation_id,
        model = %request.model.id,
        context_items = request.context_items.len(),
        attachments = request.attachments.len(),
        "generating mock reply"
    );

    let conversation_id = request.conversation_id.clone();
    let chunks = mock_reply_chunks(&request);

    let (tx, rx) = mpsc::channel::<Result<String, std::convert::Infallible>>(16);
    tokio::spawn(async move {
        for (index, chunk) in chunks.into_iter().enumerate() {
            if chunk.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(chunk.delay_ms)).await;
            }
            if tx.send(Ok(chunk.text)).await.is_err() {
                return; // client went away
            }
            if index == 0 {
                tokio::time::sleep(std::time::Duration::from_millis(ACK_PAUSE_MS)).await;
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache, no-transform")
        .header("x-conversation-id", conversation_id)
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
