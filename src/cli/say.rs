//! One-shot "say" command: stream a single reply to stdout.

use std::error::Error;
use std::io;

use super::render::TerminalRenderer;
use super::Backend;
use crate::core::session::{SessionController, StreamOutcome};

pub async fn run_say(backend: Backend, prompt: Vec<String>) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: palaver say <prompt>");
        std::process::exit(1);
    }

    let controller = SessionController::builder(backend.client.clone(), backend.chat_url())
        .observer(TerminalRenderer::new(io::stdout()))
        .build();

    let stopper = controller.clone();
    let outcome = tokio::select! {
        outcome = controller.send(&prompt) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            stopper.stop();
            StreamOutcome::Cancelled
        }
    };

    match outcome {
        StreamOutcome::Completed => Ok(()),
        StreamOutcome::Cancelled => std::process::exit(130),
        StreamOutcome::ConnectionFailed { .. } | StreamOutcome::ConnectionLost => {
            std::process::exit(1)
        }
    }
}
