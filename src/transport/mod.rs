pub mod http;
pub mod stream;
pub mod traits;
pub mod types;

pub use http::HttpTransport;
pub use traits::ChatTransport;
pub use types::{ChatRequestBody, ModelRef, RequestAttachment, StreamEvent, TransportError};
