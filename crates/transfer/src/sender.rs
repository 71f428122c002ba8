//! Sender session: connects to the receiver's identifier, accumulates a
//! file selection, and streams the batch on explicit trigger.

use std::path::Path;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use piclink_data_channel::{ChannelError, MessageChannel};
use piclink_protocol::{ControlMessage, FileMessage};

/// Sender session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Outbound connection request in flight.
    Connecting,
    /// Channel open; the user may select files.
    Connected,
    /// Batch transmission in progress.
    Sending,
    /// Terminator sent. Fire-and-forget: no acknowledgment is awaited,
    /// and a later close does not leave this state.
    Done,
    /// Connection failed or closed before the batch finished.
    Error,
}

/// Sender policies.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Inter-item delay used when the transport exposes no buffered-amount
    /// signal.
    pub pacing_delay: Duration,
    /// When the transport reports its buffered amount, wait until it drops
    /// below this mark before the next item.
    pub high_water_mark: u64,
    /// Poll interval while draining above the high-water mark.
    pub poll_interval: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            pacing_delay: Duration::from_millis(100),
            high_water_mark: 256 * 1024,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// One user-selected file awaiting transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl OutgoingFile {
    /// Reads a file from disk, deriving the display name and content type
    /// from the path.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".into());
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(mime_for_extension)
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(Self {
            name,
            mime_type,
            data,
        })
    }
}

/// Content type for the photo formats a phone camera roll produces.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Errors terminating a sender session.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("failed to connect: {0}")]
    Connect(#[source] ChannelError),

    #[error("channel closed before the batch finished")]
    ChannelClosed,

    #[error("channel error: {0}")]
    Channel(#[source] ChannelError),

    #[error("nothing selected to send")]
    EmptyBatch,

    #[error("cancelled")]
    Cancelled,
}

/// One sender-side transfer session.
pub struct SenderSession<C> {
    config: SenderConfig,
    cancel: CancellationToken,
    channel: C,
    selection: Vec<OutgoingFile>,
    state_tx: watch::Sender<SenderState>,
    sent_tx: watch::Sender<u32>,
}

impl<C: MessageChannel> SenderSession<C> {
    /// Dials the receiver and returns the connected session plus watch
    /// handles for state and sent-count.
    ///
    /// A missing peer identifier never reaches this point: the launch URL
    /// parser fails first. Dial failures are fatal; the user-facing
    /// recovery is rescan-and-reconnect.
    pub async fn connect<F>(
        config: SenderConfig,
        cancel: CancellationToken,
        dial: F,
    ) -> Result<(Self, watch::Receiver<SenderState>, watch::Receiver<u32>), SendError>
    where
        F: Future<Output = Result<C, ChannelError>>,
    {
        let (state_tx, state_rx) = watch::channel(SenderState::Connecting);
        let (sent_tx, sent_rx) = watch::channel(0u32);

        let channel = match dial.await {
            Ok(channel) => channel,
            Err(ChannelError::Cancelled) => return Err(SendError::Cancelled),
            Err(e) => return Err(SendError::Connect(e)),
        };

        state_tx.send_replace(SenderState::Connected);
        info!("connected to receiver");

        Ok((
            Self {
                config,
                cancel,
                channel,
                selection: Vec::new(),
                state_tx,
                sent_tx,
            },
            state_rx,
            sent_rx,
        ))
    }

    /// Adds a file to the pending selection. Does not transition state.
    pub fn select(&mut self, file: OutgoingFile) {
        debug!(name = %file.name, size = file.data.len(), "file selected");
        self.selection.push(file);
    }

    /// Files currently selected for the next batch.
    pub fn selection(&self) -> &[OutgoingFile] {
        &self.selection
    }

    /// Streams the selected batch, then the terminator. Explicit trigger
    /// only; never called automatically.
    ///
    /// Each item carries its ordinal index and the batch total fixed at
    /// trigger time. Between items the session paces on the channel's
    /// buffered amount when available, falling back to a fixed delay.
    /// Returns the number of files sent.
    ///
    /// An empty selection transmits nothing and leaves the session in
    /// `Connected`.
    pub async fn send_batch(&mut self) -> Result<u32, SendError> {
        if self.selection.is_empty() {
            debug!("send triggered with empty selection, nothing to do");
            return Err(SendError::EmptyBatch);
        }

        self.state_tx.send_replace(SenderState::Sending);
        let batch = std::mem::take(&mut self.selection);
        let total = batch.len() as u32;
        info!(total, "batch transmission started");

        for (index, file) in batch.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.state_tx.send_replace(SenderState::Error);
                return Err(SendError::Cancelled);
            }

            let index = index as u32;
            let size = file.data.len();
            let msg = ControlMessage::File(FileMessage {
                name: file.name,
                mime_type: file.mime_type,
                data: file.data,
                index,
                total,
            });
            self.transmit(&msg).await?;
            self.sent_tx.send_replace(index + 1);
            debug!(index, total, size, "file sent");

            if index + 1 < total {
                self.pace().await;
            }
        }

        self.transmit(&ControlMessage::Done).await?;
        self.state_tx.send_replace(SenderState::Done);
        info!(total, "batch complete, terminator sent");
        Ok(total)
    }

    /// Closes the channel. After `Done` this is a no-op as far as the
    /// state machine is concerned.
    pub async fn close(&mut self) {
        self.channel.close().await;
    }

    async fn transmit(&mut self, msg: &ControlMessage) -> Result<(), SendError> {
        self.channel.send(msg).await.map_err(|e| {
            self.state_tx.send_replace(SenderState::Error);
            match e {
                ChannelError::Closed => SendError::ChannelClosed,
                ChannelError::Io(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::BrokenPipe
                            | std::io::ErrorKind::ConnectionReset
                            | std::io::ErrorKind::UnexpectedEof
                    ) =>
                {
                    SendError::ChannelClosed
                }
                other => SendError::Channel(other),
            }
        })
    }

    /// Backpressure between items: drain below the high-water mark when
    /// the transport reports its buffered amount, else a fixed delay.
    async fn pace(&self) {
        match self.channel.buffered_amount() {
            Some(mut buffered) => {
                while buffered > self.config.high_water_mark && !self.cancel.is_cancelled() {
                    tokio::time::sleep(self.config.poll_interval).await;
                    buffered = self.channel.buffered_amount().unwrap_or(0);
                }
            }
            None => tokio::time::sleep(self.config.pacing_delay).await,
        }
    }
}
