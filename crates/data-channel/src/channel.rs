//! The message channel abstraction and its framed transport.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use piclink_protocol::ControlMessage;

use crate::wire::{read_frame, write_frame};
use crate::ChannelError;

/// Reliable, ordered, bidirectional message transport between two peers.
///
/// Messages arrive in the exact order sent; the receiver never needs
/// resequencing logic.
pub trait MessageChannel {
    /// Transmits one message.
    fn send(
        &mut self,
        msg: &ControlMessage,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Receives the next message.
    ///
    /// `Ok(None)` means the peer closed the channel in an orderly way.
    /// [`ChannelError::UnknownMessage`] leaves the channel usable; the
    /// caller decides whether to skip the frame or abort.
    fn recv(
        &mut self,
    ) -> impl Future<Output = Result<Option<ControlMessage>, ChannelError>> + Send;

    /// Bytes queued locally but not yet handed to the transport, when the
    /// transport exposes that signal.
    fn buffered_amount(&self) -> Option<u64>;

    /// Closes the channel. Best effort; errors are discarded.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// [`MessageChannel`] over any byte stream, using length-prefixed JSON
/// frames.
pub struct FramedChannel<R, W> {
    reader: R,
    writer: W,
}

/// The TCP-backed channel both apps use.
pub type TcpChannel = FramedChannel<BufReader<OwnedReadHalf>, BufWriter<OwnedWriteHalf>>;

impl<R, W> FramedChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R, W> MessageChannel for FramedChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, msg: &ControlMessage) -> Result<(), ChannelError> {
        write_frame(&mut self.writer, msg).await
    }

    async fn recv(&mut self) -> Result<Option<ControlMessage>, ChannelError> {
        let Some(payload) = read_frame(&mut self.reader).await? else {
            return Ok(None);
        };
        Ok(Some(ControlMessage::decode(&payload)?))
    }

    fn buffered_amount(&self) -> Option<u64> {
        // Kernel socket buffers are not observable from here.
        None
    }

    async fn close(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}
