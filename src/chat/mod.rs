//! Interactive tutoring chat.
//!
//! This module provides the conversation model and the streaming session
//! behind the `tutor-chat` REPL:
//!
//! - [`state`]: the conversation list, in-flight flag and active style,
//!   changed only through [`ConversationEvent`]s
//! - [`session`]: runs turns against a backend and streams answers into a
//!   renderer
//! - [`quick`]: canned prompts offered at the start of a conversation
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod quick;
mod session;
mod state;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ChatConfigFile};
pub use quick::{QUICK_PROMPT_LIMIT, QUICK_PROMPTS, quick_prompt, quick_prompts_visible};
pub use session::{SessionStats, TurnOutcome, TutorSession};
pub use state::{
    APOLOGY, ConversationEvent, ConversationState, INTERRUPTED_NOTE, greeting_for,
    style_announcement,
};
