use serde::{Deserialize, Serialize};

use crate::types::{Message, TutorStyle};

/// Maximum number of prior messages sent along with a turn.
pub const HISTORY_WINDOW: usize = 10;

/// Body of a `POST /chat/stream` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatStreamRequest {
    /// The project whose documents ground the answer.
    pub project_id: String,

    /// The user's message, tagged with the active style.
    pub message: String,

    /// The most recent messages, oldest first.
    pub session_history: Vec<Message>,

    /// Documents the backend should restrict retrieval to.
    pub selected_documents: Vec<String>,

    /// Instructions for the remote model.
    pub system_prompt: String,
}

impl ChatStreamRequest {
    /// Create a request for `text` sent in the given style.
    pub fn new(project_id: impl Into<String>, style: TutorStyle, text: &str) -> Self {
        Self {
            project_id: project_id.into(),
            message: compose_message(style, text),
            session_history: Vec::new(),
            selected_documents: Vec::new(),
            system_prompt: String::new(),
        }
    }

    /// Sets the history to the last [`HISTORY_WINDOW`] entries of `messages`.
    pub fn with_history(mut self, messages: &[Message]) -> Self {
        let start = messages.len().saturating_sub(HISTORY_WINDOW);
        self.session_history = messages[start..].to_vec();
        self
    }

    /// Sets the target documents.
    pub fn with_documents(mut self, documents: Vec<String>) -> Self {
        self.selected_documents = documents;
        self
    }

    /// Sets the instruction prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

/// Tags the user's text with the style it was asked in.
pub fn compose_message(style: TutorStyle, text: &str) -> String {
    format!("[Tutor style: {}] {}", style.display_name(), text)
}

/// Picks the documents a turn targets.
///
/// An explicit selection wins; otherwise the single document the chat was
/// opened on; otherwise nothing, which lets the backend search the whole
/// project.
pub fn resolve_documents(selected: &[String], document_id: Option<&str>) -> Vec<String> {
    if !selected.is_empty() {
        selected.to_vec()
    } else if let Some(id) = document_id.filter(|id| !id.is_empty()) {
        vec![id.to_string()]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(len: usize) -> Vec<Message> {
        (0..len)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("q{i}"))
                } else {
                    Message::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn history_is_capped() {
        let messages = conversation(25);
        let request = ChatStreamRequest::new("p1", TutorStyle::Balanced, "hi").with_history(&messages);
        assert_eq!(request.session_history.len(), HISTORY_WINDOW);
        assert_eq!(request.session_history[0].content, "a15");
        assert_eq!(request.session_history[9].content, "q24");
    }

    #[test]
    fn short_history_is_kept_whole() {
        let messages = conversation(3);
        let request = ChatStreamRequest::new("p1", TutorStyle::Balanced, "hi").with_history(&messages);
        assert_eq!(request.session_history, messages);
    }

    #[test]
    fn message_is_tagged_with_style() {
        let request = ChatStreamRequest::new("p1", TutorStyle::Socratic, "Why is the sky blue?");
        assert_eq!(
            request.message,
            "[Tutor style: Socratic] Why is the sky blue?"
        );
    }

    #[test]
    fn document_resolution() {
        let explicit = vec!["a".to_string(), "b".to_string()];
        assert_eq!(resolve_documents(&explicit, Some("c")), explicit);
        assert_eq!(resolve_documents(&[], Some("c")), vec!["c".to_string()]);
        assert!(resolve_documents(&[], Some("")).is_empty());
        assert!(resolve_documents(&[], None).is_empty());
    }

    #[test]
    fn wire_format() {
        let request = ChatStreamRequest::new("p1", TutorStyle::Simple, "hi")
            .with_history(&[Message::assistant("Hello")])
            .with_documents(vec!["d1".to_string()])
            .with_system_prompt("Be kind.");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "project_id": "p1",
                "message": "[Tutor style: Simple] hi",
                "session_history": [{"role": "assistant", "content": "Hello"}],
                "selected_documents": ["d1"],
                "system_prompt": "Be kind."
            })
        );
    }
}
