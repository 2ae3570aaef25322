//! Interactive tutor chat.
//!
//! This binary provides a streaming REPL for studying a project's documents
//! with the AI tutor.
//!
//! # Usage
//!
//! ```bash
//! # Study a whole project
//! tutor-chat --project bio-101
//!
//! # Open the tutor on one document
//! tutor-chat --project bio-101 --document doc-7 --document-name "Chapter 3"
//!
//! # Read defaults from a file and log requests to stderr
//! tutor-chat --config tutor.yaml --verbose
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/style <key>` - Switch teaching style
//! - `/quick <n>` - Ask one of the starter prompts
//! - `/sources` - Show what the last answer cited
//! - `/clear` - Start over
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::Level;

use tutor::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, TurnOutcome, TutorSession,
    help_text, parse_command,
};
use tutor::{FileSettingsStore, SettingsStore, TutorClient, TutorStyle};

/// Main entry point for the tutor-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("tutor-chat [OPTIONS]");
    let config = ChatConfig::load(args)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if config.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .init();

    let settings: Arc<dyn SettingsStore> = match config.settings_dir.as_ref() {
        Some(dir) => Arc::new(FileSettingsStore::new(dir)),
        None => Arc::new(FileSettingsStore::default_location()?),
    };
    let client = TutorClient::with_options(config.base_url.clone(), config.timeout)?;
    tracing::debug!(url = %client.chat_stream_url(), "tutor backend");

    let use_color = config.use_color;
    let mut session = TutorSession::new(client, settings, config);

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut renderer = PlainTextRenderer::with_color(use_color).with_interrupt(interrupted.clone());
    let mut rl = DefaultEditor::new()?;

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!(
        "AI Tutor (project: {}, style: {})",
        session.config().project_id,
        session.style().display_name()
    );
    println!("Type /help for commands, /quit to exit\n");
    print_conversation_start(&session, &mut renderer);

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.clear();
                            renderer.print_info("Conversation cleared.");
                            print_conversation_start(&session, &mut renderer);
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Style(key) => match session.set_style(&key) {
                            Ok(_) => print_last_message(&session, &mut renderer),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::ListStyles => {
                            print_styles(session.style());
                        }
                        ChatCommand::Quick(position) => {
                            match session.send_quick_prompt(position, &mut renderer).await {
                                Ok(outcome) => report_outcome(&outcome),
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::Sources => {
                            print_sources(&session);
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular question - send to the tutor
                let outcome = session.send_turn(line, &mut renderer).await;
                report_outcome(&outcome);
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn report_outcome(outcome: &TurnOutcome) {
    if let TurnOutcome::Failed(err) = outcome {
        tracing::debug!(error = %err, "turn ended with the apology");
    }
}

fn print_last_message(session: &TutorSession<TutorClient>, renderer: &mut PlainTextRenderer) {
    if let Some(message) = session.messages().last() {
        renderer.start_response();
        renderer.print_text(&message.content);
        renderer.finish_response();
    }
}

fn print_conversation_start(
    session: &TutorSession<TutorClient>,
    renderer: &mut PlainTextRenderer,
) {
    print_last_message(session, renderer);
    if let Some(prompts) = session.quick_prompts() {
        renderer.print_info("Quick prompts (use /quick <n>):");
        for (idx, prompt) in prompts.iter().enumerate() {
            renderer.print_info(&format!("  {}. {}", idx + 1, prompt));
        }
        println!();
    }
}

fn print_styles(active: TutorStyle) {
    println!("    Teaching styles:");
    for style in TutorStyle::ALL {
        let marker = if style == active { "*" } else { " " };
        println!(
            "    {} {:<9} {}: {}",
            marker,
            style.key(),
            style.display_name(),
            style.description()
        );
    }
}

fn print_sources(session: &TutorSession<TutorClient>) {
    let sources = session.last_sources();
    if sources.is_empty() {
        println!("    No sources for the last answer.");
        return;
    }
    println!("    Sources:");
    for (idx, source) in sources.iter().enumerate() {
        let name = if source.doc_name.is_empty() {
            &source.doc_id
        } else {
            &source.doc_name
        };
        println!("      {}. {}", idx + 1, name);
        if !source.chunk_text.is_empty() {
            println!("         {}", source.chunk_text.trim());
        }
    }
}

fn print_stats(session: &TutorSession<TutorClient>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Project: {}", stats.project_id);
    println!("      Style: {}", stats.style.display_name());
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Turns: {} ({} failed, {} interrupted)",
        stats.turns, stats.failed_turns, stats.interrupted_turns
    );
    println!("      Sources in last answer: {}", stats.last_source_count);
}

fn print_config(session: &TutorSession<TutorClient>) {
    let stats = session.stats();
    let config = session.config();
    println!("    Current Configuration:");
    println!("      Project: {}", stats.project_id);
    println!(
        "      Document: {}",
        stats.document_name.as_deref().unwrap_or("(none)")
    );
    println!("      Topic: {}", stats.topic.as_deref().unwrap_or("(none)"));
    if stats.documents.is_empty() {
        println!("      Documents: (whole project)");
    } else {
        println!("      Documents: {}", stats.documents.join(", "));
    }
    println!("      Style: {}", stats.style);
    println!("      Backend: {}", session.backend().base_url());
    match config.settings_dir.as_ref() {
        Some(dir) => println!("      Settings: {}", dir.display()),
        None => println!("      Settings: (default location)"),
    }
    match config.timeout {
        Some(timeout) => println!("      Timeout: {}s", timeout.as_secs()),
        None => println!("      Timeout: (default)"),
    }
}
