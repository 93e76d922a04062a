//! Line-based interactive chat.

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use super::render::{format_message, TerminalRenderer};
use super::Backend;
use crate::core::history::History;
use crate::core::session::{SendError, SessionController, StreamOutcome};

#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput {
    Message(String),
    Stop,
    Reset,
    Quit,
    Unknown(String),
    Blank,
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ChatInput::Blank;
        }
        match trimmed {
            "/stop" => ChatInput::Stop,
            "/reset" => ChatInput::Reset,
            "/quit" | "/exit" => ChatInput::Quit,
            command if command.starts_with('/') && !command.contains(char::is_whitespace) => {
                ChatInput::Unknown(command.to_string())
            }
            _ => ChatInput::Message(trimmed.to_string()),
        }
    }
}

/// What to print once a send settles. A reset already told the user the
/// reply is gone, so its cancellation stays quiet.
fn outcome_notice(result: &Result<StreamOutcome, SendError>, reset: bool) -> Option<&'static str> {
    match result {
        Ok(StreamOutcome::Cancelled) if !reset => Some("⏹  Stopped."),
        Err(SendError::Busy) => Some("⏳ A reply is still streaming; use /stop first."),
        _ => None,
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

pub async fn run_chat(backend: Backend, no_history: bool) -> Result<(), Box<dyn Error>> {
    let history = backend.history(no_history);
    let messages = history.as_ref().map(History::load).unwrap_or_default();

    println!("💬 Palaver ({})", backend.chat_url());
    println!("Type a message and press Enter. /stop, /reset, /quit. Ctrl+C stops a reply.");
    if !messages.is_empty() {
        println!("Restored {} messages (use /reset to start over):", messages.len());
        println!();
        for message in &messages {
            println!("{}", format_message(message));
        }
    }

    let mut builder =
        SessionController::builder(backend.client.clone(), backend.chat_url()).messages(messages);
    if let Some(history) = history {
        builder = builder.observer(history);
    }
    let controller = builder.observer(TerminalRenderer::new(io::stdout())).build();

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Result<StreamOutcome, SendError>>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match ChatInput::parse(&line) {
                    ChatInput::Quit => break,
                    ChatInput::Stop => {
                        if !controller.stop() {
                            println!("Nothing to stop.");
                            prompt();
                        }
                    }
                    ChatInput::Reset => {
                        controller.reset();
                        println!("🧹 Conversation cleared.");
                        prompt();
                    }
                    ChatInput::Unknown(command) => {
                        eprintln!("⚠️  Unknown command: {command}");
                        prompt();
                    }
                    ChatInput::Blank => prompt(),
                    ChatInput::Message(text) => {
                        let controller = controller.clone();
                        let done_tx = done_tx.clone();
                        tokio::spawn(async move {
                            let _ = done_tx.send(controller.send(&text).await);
                        });
                    }
                }
            }
            Some(result) = done_rx.recv() => {
                debug!(?result, "Send settled");
                let reset = controller.messages().is_empty();
                match outcome_notice(&result, reset) {
                    Some(notice) if matches!(result, Err(SendError::Busy)) => {
                        eprintln!("{notice}");
                        continue;
                    }
                    Some(notice) => println!("{notice}"),
                    // The reset already printed its own prompt.
                    None if reset && matches!(result, Ok(StreamOutcome::Cancelled)) => continue,
                    None => {}
                }
                prompt();
            }
            _ = tokio::signal::ctrl_c() => {
                if !controller.stop() {
                    println!();
                    break;
                }
            }
        }
    }

    controller.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_commands_and_messages() {
        assert_eq!(ChatInput::parse("  /stop "), ChatInput::Stop);
        assert_eq!(ChatInput::parse("/reset"), ChatInput::Reset);
        assert_eq!(ChatInput::parse("/exit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("   "), ChatInput::Blank);
        assert_eq!(
            ChatInput::parse("/help"),
            ChatInput::Unknown("/help".to_string())
        );
        assert_eq!(
            ChatInput::parse(" best opener for French? "),
            ChatInput::Message("best opener for French?".to_string())
        );
        assert_eq!(
            ChatInput::parse("/2 of my games were lost"),
            ChatInput::Message("/2 of my games were lost".to_string())
        );
    }

    #[test]
    fn cancellation_after_reset_is_silent() {
        let cancelled = Ok(StreamOutcome::Cancelled);
        assert_eq!(outcome_notice(&cancelled, false), Some("⏹  Stopped."));
        assert_eq!(outcome_notice(&cancelled, true), None);
        assert_eq!(outcome_notice(&Ok(StreamOutcome::Completed), false), None);
        assert!(outcome_notice(&Err(SendError::Busy), true).is_some());
    }
}
