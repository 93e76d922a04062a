//! Plain-text rendering of the transcript for the terminal surfaces.

use std::io::Write;

use crate::core::message::{Message, MessageId, Source};
use crate::core::session::TranscriptObserver;
use crate::core::transcript::Transcript;

pub fn format_sources(sources: &[Source]) -> String {
    let mut out = String::from("Sources:\n");
    for source in sources {
        match &source.url {
            Some(url) => out.push_str(&format!("  - [{}] {} <{}>\n", source.kind, source.title, url)),
            None => out.push_str(&format!("  - [{}] {}\n", source.kind, source.title)),
        }
    }
    out
}

/// Full rendering of a finished message, used when replaying history.
pub fn format_message(message: &Message) -> String {
    let mut out = if message.is_user() {
        format!("You: {}\n", message.content)
    } else {
        format!("{}\n", message.content)
    };
    if let Some(sources) = message.sources.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format_sources(sources));
    }
    out
}

/// Prints the in-flight assistant reply incrementally as the transcript
/// changes: new text as it streams, tool activity as it starts, and the
/// source list once the reply is finished.
pub struct TerminalRenderer<W> {
    out: W,
    current: Option<MessageId>,
    printed: String,
    tools_shown: usize,
    finished: bool,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            current: None,
            printed: String::new(),
            tools_shown: 0,
            finished: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn track(&mut self, reply: &Message) {
        if self.current.as_ref() != Some(&reply.id) {
            self.current = Some(reply.id.clone());
            self.printed.clear();
            self.tools_shown = 0;
            self.finished = false;
        }
    }

    fn render(&mut self, reply: &Message) -> std::io::Result<()> {
        match reply.active_tools.as_deref() {
            Some(tools) => {
                for tool in tools.iter().skip(self.tools_shown) {
                    writeln!(self.out, "⚙ {tool}…")?;
                }
                self.tools_shown = tools.len();
            }
            None => self.tools_shown = 0,
        }

        if let Some(suffix) = reply.content.strip_prefix(self.printed.as_str()) {
            write!(self.out, "{suffix}")?;
        } else {
            // The text was replaced, e.g. by a connection notice.
            write!(self.out, "\n{}", reply.content)?;
        }
        self.printed.clone_from(&reply.content);

        if !reply.streaming {
            self.finished = true;
            writeln!(self.out)?;
            if let Some(sources) = reply.sources.as_deref().filter(|s| !s.is_empty()) {
                write!(self.out, "{}", format_sources(sources))?;
            }
        }
        self.out.flush()
    }
}

impl<W: Write + Send> TranscriptObserver for TerminalRenderer<W> {
    fn transcript_changed(&mut self, transcript: &Transcript) {
        let Some(reply) = transcript.messages().last().filter(|m| m.is_assistant()) else {
            return;
        };
        self.track(reply);
        if self.finished {
            return;
        }
        // A closed terminal must not take the session down with it.
        let _ = self.render(reply);
    }

    fn transcript_reset(&mut self) {
        self.current = None;
        self.printed.clear();
        self.tools_shown = 0;
        self.finished = false;
    }
}
