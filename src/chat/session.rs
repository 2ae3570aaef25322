//! Core tutor session management.
//!
//! This module provides the `TutorSession` struct which owns the
//! conversation state and runs streaming turns against a [`ChatBackend`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::time::MissedTickBehavior;

use crate::chat::config::ChatConfig;
use crate::chat::quick::{QUICK_PROMPTS, quick_prompt, quick_prompts_visible};
use crate::chat::state::{APOLOGY, ConversationEvent, ConversationState, greeting_for};
use crate::client::ChatBackend;
use crate::error::{Error, Result};
use crate::instructions::build_instructions;
use crate::observability::{
    STYLE_CHANGES, TURN_DURATION, TURNS, TURNS_FAILED, TURNS_INTERRUPTED, TURNS_SKIPPED,
};
use crate::render::Renderer;
use crate::settings::{SettingsStore, TutorSettings};
use crate::stream::{ResponseAssembler, decode_text_stream};
use crate::types::{ChatStreamRequest, Message, SourceCitation, TutorStyle};

/// How often a stalled stream re-checks the interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// How a call to [`TutorSession::send_turn`] ended.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The answer streamed to completion.
    Completed,
    /// The user stopped the answer; the partial text was kept.
    Interrupted,
    /// The turn failed and the apology was shown. Carries the logged error.
    Failed(Error),
    /// Nothing was sent: the text was blank or a turn was already running.
    Skipped,
}

impl TurnOutcome {
    /// Returns true if the answer completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed)
    }
}

/// Statistics about the current chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The project the session talks about.
    pub project_id: String,
    /// The document display name, if any.
    pub document_name: Option<String>,
    /// The topic label, if any.
    pub topic: Option<String>,
    /// Documents sent with every request.
    pub documents: Vec<String>,
    /// The active teaching style.
    pub style: TutorStyle,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Turns sent to the backend.
    pub turns: u64,
    /// Turns that ended with the apology.
    pub failed_turns: u64,
    /// Turns stopped by the user.
    pub interrupted_turns: u64,
    /// Citations attached to the most recent answer.
    pub last_source_count: usize,
}

/// The parts of a session a running turn writes to.
///
/// If the turn is dropped before it settles, the conversation is left as if
/// the user had interrupted it, so the in-flight flag never outlives the turn.
struct ActiveTurn<'a> {
    state: &'a mut ConversationState,
    sources: &'a mut Vec<SourceCitation>,
    interrupted_turns: &'a mut u64,
}

impl ActiveTurn<'_> {
    async fn stream_answer<B: ChatBackend>(
        &mut self,
        backend: &B,
        token: Option<&str>,
        request: &ChatStreamRequest,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let mut poll = tokio::time::interval(INTERRUPT_POLL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Waiting for the response headers honours the interrupt flag too.
        let mut send = backend.stream_chat(request, token);
        let body = loop {
            if renderer.should_interrupt() {
                return Ok(self.interrupt("", renderer));
            }
            tokio::select! {
                result = &mut send => break result?,
                _ = poll.tick() => {}
            }
        };

        self.state.apply(ConversationEvent::ResponseStarted);
        renderer.start_response();

        let mut assembler = ResponseAssembler::new();
        let mut chunks = Box::pin(decode_text_stream(body));

        loop {
            if renderer.should_interrupt() {
                return Ok(self.interrupt(assembler.visible(), renderer));
            }
            tokio::select! {
                next = chunks.next() => match next {
                    Some(Ok(text)) => {
                        assembler.push(&text);
                        self.state.apply(ConversationEvent::ResponseUpdated(
                            assembler.visible().to_string(),
                        ));
                        renderer.print_text(&assembler.take_stable());
                    }
                    Some(Err(err)) => return Err(err),
                    None => break,
                },
                _ = poll.tick() => {}
            }
        }

        renderer.print_text(&assembler.take_remaining());
        self.state.apply(ConversationEvent::ResponseUpdated(
            assembler.visible().to_string(),
        ));
        *self.sources = match assembler.sources() {
            Some(sources) => sources,
            None => {
                tracing::warn!(
                    segment = assembler.sources_segment().unwrap_or_default(),
                    "could not parse source citations"
                );
                Vec::new()
            }
        };
        self.state.apply(ConversationEvent::ResponseFinished);
        renderer.finish_response();
        tracing::debug!(
            chars = assembler.visible().chars().count(),
            sources = self.sources.len(),
            "turn completed"
        );
        Ok(TurnOutcome::Completed)
    }

    fn interrupt(&mut self, visible: &str, renderer: &mut dyn Renderer) -> TurnOutcome {
        TURNS_INTERRUPTED.click();
        *self.interrupted_turns += 1;
        self.state
            .apply(ConversationEvent::ResponseUpdated(visible.to_string()));
        self.state.apply(ConversationEvent::ResponseInterrupted);
        renderer.print_interrupted();
        tracing::info!("turn interrupted by user");
        TurnOutcome::Interrupted
    }

    fn fail(&mut self, err: Error, renderer: &mut dyn Renderer) -> TurnOutcome {
        TURNS_FAILED.click();
        tracing::error!(
            error = %err,
            transport = err.is_transport(),
            stream = err.is_stream(),
            status = ?err.status_code(),
            "tutor turn failed"
        );
        if self.state.is_streaming() {
            renderer.print_text("\n");
        } else {
            renderer.start_response();
        }
        self.state.apply(ConversationEvent::ResponseFailed);
        renderer.print_text(APOLOGY);
        renderer.finish_response();
        TurnOutcome::Failed(err)
    }
}

impl Drop for ActiveTurn<'_> {
    fn drop(&mut self) {
        if self.state.in_flight() {
            TURNS_INTERRUPTED.click();
            *self.interrupted_turns += 1;
            tracing::warn!("turn dropped before it finished");
            self.state.apply(ConversationEvent::ResponseInterrupted);
        }
    }
}

/// A tutoring conversation.
///
/// Only one turn runs at a time; [`send_turn`](Self::send_turn) takes
/// `&mut self` and additionally refuses to start while the state reports a
/// turn in flight.
pub struct TutorSession<B: ChatBackend> {
    backend: B,
    settings: Arc<dyn SettingsStore>,
    config: ChatConfig,
    state: ConversationState,
    last_sources: Vec<SourceCitation>,
    turns: u64,
    failed_turns: u64,
    interrupted_turns: u64,
}

impl<B: ChatBackend> TutorSession<B> {
    /// Creates a session. The initial style comes from the settings store.
    pub fn new(backend: B, settings: Arc<dyn SettingsStore>, config: ChatConfig) -> Self {
        let style = TutorSettings::load(settings.as_ref()).tutor_style;
        let greeting = greeting_for(config.document_name.as_deref(), &config.project_id);
        tracing::debug!(project = %config.project_id, style = %style, "starting tutor session");
        Self {
            backend,
            settings,
            config,
            state: ConversationState::new(style, greeting),
            last_sources: Vec::new(),
            turns: 0,
            failed_turns: 0,
            interrupted_turns: 0,
        }
    }

    /// Sends `text` to the tutor and streams the answer into `renderer`.
    ///
    /// Blank text and calls made while a turn is in flight are skipped
    /// without touching the conversation. Failures never escape: the raw
    /// error is logged and the user sees the apology. Dropping the returned
    /// future part-way ends the turn as an interruption.
    pub async fn send_turn(&mut self, text: &str, renderer: &mut dyn Renderer) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() || self.state.in_flight() {
            TURNS_SKIPPED.click();
            return TurnOutcome::Skipped;
        }

        // History is taken before the question joins the conversation.
        let request = self.build_request(text);
        // Read on every send so a token refreshed elsewhere is picked up.
        let token = self.settings.token();
        self.state
            .apply(ConversationEvent::UserSubmitted(text.to_string()));
        TURNS.click();
        self.turns += 1;
        self.last_sources.clear();

        let start = Instant::now();
        let mut turn = ActiveTurn {
            state: &mut self.state,
            sources: &mut self.last_sources,
            interrupted_turns: &mut self.interrupted_turns,
        };
        let result = turn
            .stream_answer(&self.backend, token.as_deref(), &request, renderer)
            .await;
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.failed_turns += 1;
                turn.fail(err, renderer)
            }
        };
        TURN_DURATION.add(start.elapsed().as_secs_f64());
        outcome
    }

    /// Sends the quick prompt at `position` (1-based).
    ///
    /// Quick prompts are only offered at the start of a conversation.
    pub async fn send_quick_prompt(
        &mut self,
        position: usize,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        if !quick_prompts_visible(self.state.message_count()) {
            return Err(Error::validation(
                "quick prompts are only available before the conversation starts",
                Some("quick".to_string()),
            ));
        }
        let prompt = quick_prompt(position).ok_or_else(|| {
            Error::validation(
                format!(
                    "there is no quick prompt {position} (choose 1-{})",
                    QUICK_PROMPTS.len()
                ),
                Some("quick".to_string()),
            )
        })?;
        Ok(self.send_turn(prompt, renderer).await)
    }

    fn build_request(&self, text: &str) -> ChatStreamRequest {
        let style = self.state.style();
        let instructions = build_instructions(
            style,
            self.config.topic.as_deref(),
            self.config.document_name.as_deref(),
        );
        ChatStreamRequest::new(self.config.project_id.clone(), style, text)
            .with_history(self.state.messages())
            .with_documents(self.config.documents())
            .with_system_prompt(instructions)
    }

    /// Switches the teaching style and announces it in the conversation.
    ///
    /// Unknown keys are rejected and leave the session untouched. The choice
    /// is not written back to the settings store.
    pub fn set_style(&mut self, key: &str) -> Result<TutorStyle> {
        let style: TutorStyle = key.parse()?;
        if !self.state.apply(ConversationEvent::StyleChanged(style)) {
            return Err(Error::validation(
                "cannot change style while the tutor is answering",
                Some("style".to_string()),
            ));
        }
        STYLE_CHANGES.click();
        tracing::debug!(style = %style, "tutor style changed");
        Ok(style)
    }

    /// Resets the conversation to the greeting. The style is kept.
    pub fn clear(&mut self) {
        if self.state.apply(ConversationEvent::Cleared) {
            self.last_sources.clear();
        }
    }

    /// The active teaching style.
    pub fn style(&self) -> TutorStyle {
        self.state.style()
    }

    /// The conversation, oldest first.
    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.state.message_count()
    }

    /// Returns true while a turn is being answered.
    pub fn in_flight(&self) -> bool {
        self.state.in_flight()
    }

    /// The quick prompts, while they are on offer.
    pub fn quick_prompts(&self) -> Option<&'static [&'static str]> {
        if quick_prompts_visible(self.state.message_count()) {
            Some(&QUICK_PROMPTS)
        } else {
            None
        }
    }

    /// Citations attached to the most recent completed answer.
    pub fn last_sources(&self) -> &[SourceCitation] {
        &self.last_sources
    }

    /// The session configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The backend turns are sent to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns statistics about the current session.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            project_id: self.config.project_id.clone(),
            document_name: self.config.document_name.clone(),
            topic: self.config.topic.clone(),
            documents: self.config.documents(),
            style: self.state.style(),
            message_count: self.state.message_count(),
            turns: self.turns,
            failed_turns: self.failed_turns,
            interrupted_turns: self.interrupted_turns,
            last_source_count: self.last_sources.len(),
        }
    }
}
