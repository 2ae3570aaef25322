// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod instructions;
pub mod observability;
pub mod render;
pub mod settings;
pub mod stream;
pub mod types;

// Re-exports
pub use client::{ChatBackend, TutorClient};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsStore, TutorSettings};
pub use stream::{ByteStream, ResponseAssembler, SOURCES_MARKER, Utf8ChunkDecoder, decode_text_stream};
pub use types::*;
