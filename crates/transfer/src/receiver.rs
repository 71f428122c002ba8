//! Receiver session: accepts one inbound connection, accumulates files,
//! and finalizes on the terminator message or on channel close.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use piclink_data_channel::{ChannelError, MessageChannel};
use piclink_protocol::{ControlMessage, FileMessage};

/// Receiver session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Endpoint not yet assigned an identifier.
    Initializing,
    /// Identifier assigned and share address published; no connection yet.
    Waiting,
    /// Exactly one inbound connection accepted; no file data yet.
    Connected,
    /// At least one file has arrived.
    Receiving,
    /// Batch finalized; the accumulated files were handed over once.
    Done,
    /// Connection failed or errored; accumulated items discarded.
    Error,
}

/// What to do with a frame whose message type is unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownMessagePolicy {
    /// Treat as a malformed-message error and fail the session.
    #[default]
    Reject,
    /// Skip the frame with a warning. Only useful when talking to mixed
    /// protocol versions.
    Ignore,
}

/// Receiver policies.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Treat a channel close after at least one file as an implicit
    /// terminator instead of a failure.
    pub partial_on_close: bool,
    pub unknown_messages: UnknownMessagePolicy,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            partial_on_close: true,
            unknown_messages: UnknownMessagePolicy::default(),
        }
    }
}

/// Running counts exposed for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReceiveProgress {
    /// Files received so far.
    pub received: u32,
    /// Batch total declared by the last file message, if any arrived.
    pub announced_total: Option<u32>,
}

/// Errors terminating a receiver session.
#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error("failed to establish inbound connection: {0}")]
    Connect(#[source] ChannelError),

    #[error("channel error: {0}")]
    Channel(#[source] ChannelError),

    #[error("channel closed before any file arrived")]
    ClosedEmpty,

    #[error("channel closed mid-batch and partial finalization is disabled")]
    ClosedPartial,

    #[error("unrecognized message type: {0:?}")]
    UnknownMessage(String),

    #[error("cancelled")]
    Cancelled,
}

/// One receiver-side transfer session.
///
/// Created in `Initializing`; [`run`](Self::run) drives the rest of the
/// state machine. The caller binds the endpoint and publishes the share
/// address before calling `run` with the endpoint's accept future.
pub struct ReceiverSession {
    config: ReceiverConfig,
    cancel: CancellationToken,
    state_tx: watch::Sender<ReceiverState>,
    progress_tx: watch::Sender<ReceiveProgress>,
}

impl ReceiverSession {
    /// Creates a session plus watch handles for state and progress.
    pub fn new(
        config: ReceiverConfig,
        cancel: CancellationToken,
    ) -> (
        Self,
        watch::Receiver<ReceiverState>,
        watch::Receiver<ReceiveProgress>,
    ) {
        let (state_tx, state_rx) = watch::channel(ReceiverState::Initializing);
        let (progress_tx, progress_rx) = watch::channel(ReceiveProgress::default());
        (
            Self {
                config,
                cancel,
                state_tx,
                progress_tx,
            },
            state_rx,
            progress_rx,
        )
    }

    /// Runs the session over the connection produced by `accept`.
    ///
    /// Returns the ordered received files exactly once when the session
    /// finalizes. Finalization is triggered by the terminator message, or
    /// by an orderly close after at least one file when
    /// [`ReceiverConfig::partial_on_close`] is set. Later close or error
    /// signals cannot alter an already finalized result.
    pub async fn run<C, F>(self, accept: F) -> Result<Vec<FileMessage>, ReceiveError>
    where
        C: MessageChannel,
        F: Future<Output = Result<C, ChannelError>>,
    {
        self.set_state(ReceiverState::Waiting);

        let mut channel = match accept.await {
            Ok(channel) => channel,
            Err(ChannelError::Cancelled) => {
                self.set_state(ReceiverState::Error);
                return Err(ReceiveError::Cancelled);
            }
            Err(e) => {
                self.set_state(ReceiverState::Error);
                return Err(ReceiveError::Connect(e));
            }
        };

        self.set_state(ReceiverState::Connected);
        info!("sender connected, waiting for files");

        let mut files: Vec<FileMessage> = Vec::new();
        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    channel.close().await;
                    self.set_state(ReceiverState::Error);
                    return Err(ReceiveError::Cancelled);
                }
                event = channel.recv() => event,
            };

            match event {
                Ok(Some(ControlMessage::File(file))) => {
                    if files.is_empty() {
                        self.set_state(ReceiverState::Receiving);
                    }
                    if file.index as usize != files.len() {
                        // The channel is ordered, so this only happens with
                        // a misbehaving sender. Keep arrival order anyway.
                        warn!(
                            index = file.index,
                            expected = files.len(),
                            "file index disagrees with arrival order"
                        );
                    }
                    debug!(
                        name = %file.name,
                        index = file.index,
                        total = file.total,
                        size = file.data.len(),
                        "file received"
                    );
                    self.progress_tx.send_replace(ReceiveProgress {
                        received: files.len() as u32 + 1,
                        announced_total: Some(file.total),
                    });
                    files.push(file);
                }
                Ok(Some(ControlMessage::Done)) => {
                    info!(count = files.len(), "terminator received, finalizing");
                    self.set_state(ReceiverState::Done);
                    return Ok(files);
                }
                Ok(None) => {
                    if files.is_empty() {
                        self.set_state(ReceiverState::Error);
                        return Err(ReceiveError::ClosedEmpty);
                    }
                    if self.config.partial_on_close {
                        warn!(
                            count = files.len(),
                            "channel closed mid-batch, finalizing partial set"
                        );
                        self.set_state(ReceiverState::Done);
                        return Ok(files);
                    }
                    self.set_state(ReceiverState::Error);
                    return Err(ReceiveError::ClosedPartial);
                }
                Err(ChannelError::UnknownMessage(msg_type)) => {
                    match self.config.unknown_messages {
                        UnknownMessagePolicy::Ignore => {
                            warn!(msg_type, "ignoring unrecognized message");
                        }
                        UnknownMessagePolicy::Reject => {
                            self.set_state(ReceiverState::Error);
                            return Err(ReceiveError::UnknownMessage(msg_type));
                        }
                    }
                }
                Err(e) => {
                    self.set_state(ReceiverState::Error);
                    return Err(ReceiveError::Channel(e));
                }
            }
        }
    }

    /// Transitions state. `Done` is terminal: nothing overwrites it.
    fn set_state(&self, next: ReceiverState) {
        self.state_tx.send_if_modified(|state| {
            if *state == ReceiverState::Done || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}
