use futures::StreamExt;
use tokio::sync::mpsc;

use super::types::StreamEvent;

/// Drain a plain-text response body, decoding bytes to UTF-8 incrementally
/// and forwarding each decoded piece through `tx` as soon as it arrives.
/// The body has no framing; concatenation order is the only structure.
pub async fn read_text_stream(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    let mut stream = response.bytes_stream();
    let mut byte_buf: Vec<u8> = Vec::new();

    while let Some(chunk_result) = stream.next().await {
        let bytes = match chunk_result {
            Ok(b) => b,
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Error(format!("Stream error: {}", e)))
                    .await;
                return;
            }
        };

        byte_buf.extend_from_slice(&bytes);

        // Decode as much valid UTF-8 as possible; a multi-byte sequence
        // split across reads stays buffered until its tail arrives.
        let decoded = match std::str::from_utf8(&byte_buf) {
            Ok(s) => {
                let decoded = s.to_string();
                byte_buf.clear();
                decoded
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                if valid_up_to == 0 {
                    continue;
                }
                let decoded = std::str::from_utf8(&byte_buf[..valid_up_to])
                    .unwrap()
                    .to_string();
                byte_buf.drain(..valid_up_to);
                decoded
            }
        };

        if decoded.is_empty() {
            continue;
        }

        if tx.send(StreamEvent::Chunk(decoded)).await.is_err() {
            return; // receiver dropped
        }
    }

    let _ = tx.send(StreamEvent::Done).await;
}
