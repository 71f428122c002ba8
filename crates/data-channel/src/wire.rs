//! Framing and handshake primitives.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use piclink_protocol::{ControlMessage, PEER_ID_LEN};

use crate::{ChannelError, MAX_FRAME_SIZE};

/// Handshake response: connection accepted.
pub const CONNECT_OK: u8 = 0x01;

/// Handshake response: identifier did not match.
pub const CONNECT_REJECTED: u8 = 0x00;

/// Handshake response: endpoint already has an active session.
pub const CONNECT_BUSY: u8 = 0x02;

/// Writes one length-prefixed message frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &ControlMessage,
) -> Result<(), ChannelError> {
    let payload = msg.encode()?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ChannelError::Protocol(format!(
            "frame too large: {} bytes (max {MAX_FRAME_SIZE})",
            payload.len()
        )));
    }

    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame, returning the raw payload.
///
/// Returns `None` on orderly close (EOF at a frame boundary). EOF in the
/// middle of a frame is a protocol error.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, ChannelError> {
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if len > MAX_FRAME_SIZE {
        return Err(ChannelError::Protocol(format!(
            "frame too large: {len} bytes (max {MAX_FRAME_SIZE})"
        )));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                ChannelError::Protocol("connection closed mid-frame".into())
            }
            _ => ChannelError::Io(e),
        })?;

    Ok(Some(payload))
}

/// Writes the dialer's target peer identifier (32 hex ASCII bytes).
pub async fn write_peer_id<W: AsyncWrite + Unpin>(
    writer: &mut W,
    id: &str,
) -> Result<(), ChannelError> {
    if id.len() != PEER_ID_LEN {
        return Err(ChannelError::Protocol(format!(
            "peer identifier must be {PEER_ID_LEN} bytes, got {}",
            id.len()
        )));
    }
    writer.write_all(id.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the dialer's target peer identifier.
pub async fn read_peer_id<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, ChannelError> {
    let mut buf = [0u8; PEER_ID_LEN];
    reader.read_exact(&mut buf).await?;
    String::from_utf8(buf.to_vec())
        .map_err(|e| ChannelError::Protocol(format!("invalid identifier encoding: {e}")))
}

/// Writes the handshake response byte.
pub async fn write_connect_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: u8,
) -> Result<(), ChannelError> {
    writer.write_u8(response).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the handshake response byte.
pub async fn read_connect_response<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<u8, ChannelError> {
    Ok(reader.read_u8().await?)
}
