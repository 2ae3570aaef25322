//! Conversation state container.
//!
//! All changes to the conversation go through [`ConversationState::apply`].
//! The message list is append-only with one exception: while an answer is
//! streaming, the last message is the placeholder whose content is replaced
//! as chunks arrive.

use crate::types::{Message, TutorStyle};

/// Shown in place of an answer when the turn fails.
pub const APOLOGY: &str = "Sorry, I ran into a problem answering that. Please try again.";

/// Stored when a turn is interrupted before any text arrived.
pub const INTERRUPTED_NOTE: &str = "(response interrupted)";

/// Events that drive the conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// The user sent a message. Ignored while a turn is in flight or when
    /// the text is blank.
    UserSubmitted(String),

    /// The backend accepted the turn; append the empty answer placeholder.
    ResponseStarted,

    /// Replace the placeholder's content with the text received so far.
    ResponseUpdated(String),

    /// The answer completed.
    ResponseFinished,

    /// The turn was stopped; keep what arrived, or note the interruption.
    ResponseInterrupted,

    /// The turn failed; the placeholder (or a new message) becomes the apology.
    ResponseFailed,

    /// Switch teaching style and announce it. Ignored while a turn is in flight.
    StyleChanged(TutorStyle),

    /// Reset to the greeting. Ignored while a turn is in flight.
    Cleared,
}

/// The conversation list, in-flight flag, and active style.
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    in_flight: bool,
    streaming: bool,
    style: TutorStyle,
    greeting: String,
}

impl ConversationState {
    /// Starts a conversation with a single assistant greeting.
    pub fn new(style: TutorStyle, greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            messages: vec![Message::assistant(greeting.clone())],
            in_flight: false,
            streaming: false,
            style,
            greeting,
        }
    }

    /// Applies `event`, returning false if it was ignored.
    pub fn apply(&mut self, event: ConversationEvent) -> bool {
        match event {
            ConversationEvent::UserSubmitted(text) => {
                let text = text.trim();
                if self.in_flight || text.is_empty() {
                    return false;
                }
                self.messages.push(Message::user(text));
                self.in_flight = true;
                self.streaming = false;
                true
            }
            ConversationEvent::ResponseStarted => {
                if !self.in_flight || self.streaming {
                    return false;
                }
                self.messages.push(Message::assistant(""));
                self.streaming = true;
                true
            }
            ConversationEvent::ResponseUpdated(text) => {
                if !self.streaming {
                    return false;
                }
                match self.messages.last_mut() {
                    Some(last) => {
                        last.content = text;
                        true
                    }
                    None => false,
                }
            }
            ConversationEvent::ResponseFinished => {
                if !self.in_flight {
                    return false;
                }
                self.finish();
                true
            }
            ConversationEvent::ResponseInterrupted => {
                if !self.in_flight {
                    return false;
                }
                match self.messages.last_mut() {
                    Some(last) if self.streaming => {
                        if last.content.is_empty() {
                            last.content = INTERRUPTED_NOTE.to_string();
                        }
                    }
                    _ => self.messages.push(Message::assistant(INTERRUPTED_NOTE)),
                }
                self.finish();
                true
            }
            ConversationEvent::ResponseFailed => {
                if !self.in_flight {
                    return false;
                }
                match self.messages.last_mut() {
                    Some(last) if self.streaming => last.content = APOLOGY.to_string(),
                    _ => self.messages.push(Message::assistant(APOLOGY)),
                }
                self.finish();
                true
            }
            ConversationEvent::StyleChanged(style) => {
                if self.in_flight {
                    return false;
                }
                self.style = style;
                self.messages
                    .push(Message::assistant(style_announcement(style)));
                true
            }
            ConversationEvent::Cleared => {
                if self.in_flight {
                    return false;
                }
                self.messages = vec![Message::assistant(self.greeting.clone())];
                true
            }
        }
    }

    fn finish(&mut self) {
        self.in_flight = false;
        self.streaming = false;
    }

    /// The conversation, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns true while a turn is being answered.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Returns true once the answer placeholder exists for the current turn.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// The active teaching style.
    pub fn style(&self) -> TutorStyle {
        self.style
    }
}

/// The assistant message announcing a style switch.
pub fn style_announcement(style: TutorStyle) -> String {
    format!(
        "Switched to **{}** mode: {}.",
        style.display_name(),
        style.description()
    )
}

/// The assistant message that opens a conversation.
///
/// Names the document when one is given, else the project.
pub fn greeting_for(document_name: Option<&str>, project_id: &str) -> String {
    let subject = document_name
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(project_id);
    format!(
        "Hi! I'm your AI tutor for **{subject}**. Ask me anything about it, or pick a quick prompt to get started."
    )
}
