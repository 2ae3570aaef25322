//! Slash command parsing for the tutor chat.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the session without sending a question to the
//! tutor.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Switch teaching style. The key is checked by the session.
    Style(String),

    /// List the available teaching styles.
    ListStyles,

    /// Send the quick prompt at this 1-based position.
    Quick(usize),

    /// Show the citations of the most recent answer.
    Sources,

    /// Reset the conversation to the greeting.
    Clear,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent to the tutor as a question.
///
/// # Examples
///
/// ```
/// # use tutor::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/style socratic").is_some());
/// assert!(parse_command("What is osmosis?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "style" => match argument {
            Some(key) => ChatCommand::Style(key.to_string()),
            None => ChatCommand::ListStyles,
        },
        "styles" => ChatCommand::ListStyles,
        "quick" => match argument {
            Some(arg) => match arg.parse::<usize>() {
                Ok(position) if position > 0 => ChatCommand::Quick(position),
                _ => ChatCommand::Invalid("/quick expects a prompt number".to_string()),
            },
            None => ChatCommand::Invalid("/quick requires a prompt number".to_string()),
        },
        "sources" => ChatCommand::Sources,
        "clear" => ChatCommand::Clear,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /style <key>           Switch teaching style (simple, balanced, detailed, socratic)
  /styles                List teaching styles
  /quick <n>             Ask quick prompt n (only before the conversation starts)
  /sources               Show sources cited by the last answer
  /clear                 Start the conversation over
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat

Press Ctrl+C while the tutor is answering to stop the answer."#
}
