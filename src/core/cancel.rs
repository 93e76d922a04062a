use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle for one in-flight stream.
#[derive(Debug, Clone)]
pub struct StreamTicket {
    pub stream_id: u64,
    pub token: CancellationToken,
}

/// Holds the cancellation token of the single live stream, if any.
#[derive(Debug, Default)]
pub struct CancelSlot {
    active: Option<StreamTicket>,
    last_stream_id: u64,
}

impl CancelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a new stream. A token still held for an earlier
    /// stream is cancelled first so two streams are never live at once.
    pub fn begin(&mut self) -> StreamTicket {
        if let Some(previous) = self.active.take() {
            debug!(stream_id = previous.stream_id, "Cancelling superseded stream");
            previous.token.cancel();
        }

        self.last_stream_id += 1;
        let ticket = StreamTicket {
            stream_id: self.last_stream_id,
            token: CancellationToken::new(),
        };
        self.active = Some(ticket.clone());
        ticket
    }

    /// Signal the live stream. No-op when nothing is running.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(ticket) => {
                debug!(stream_id = ticket.stream_id, "Cancelling active stream");
                ticket.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget the ticket once its stream has ended, unless a newer stream
    /// has already replaced it.
    pub fn release(&mut self, stream_id: u64) -> bool {
        if self.is_current(stream_id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn is_current(&self, stream_id: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|ticket| ticket.stream_id == stream_id)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}
