// Public modules
pub mod chat_request;
pub mod message;
pub mod source;
pub mod style;

// Re-exports
pub use chat_request::{ChatStreamRequest, HISTORY_WINDOW, compose_message, resolve_documents};
pub use message::{Message, MessageRole};
pub use source::SourceCitation;
pub use style::{TutorStyle, TutorStyleParseError};
