pub mod classify;
pub mod context;
pub mod naming;
pub mod session;
pub mod store;

pub use classify::{classify, ContentKind};
pub use session::{ChatSession, ConversationUpdate, SendOutcome, FAILURE_MESSAGE};
pub use store::{ConversationStore, WELCOME_MESSAGE};
