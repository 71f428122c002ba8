//! Error types for the data channel.

/// Errors produced while establishing or using a channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection timed out")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("receiver rejected the peer identifier")]
    Rejected,

    #[error("receiver is busy with another session")]
    Busy,

    #[error("channel closed")]
    Closed,

    #[error("unrecognized message type: {0:?}")]
    UnknownMessage(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<piclink_protocol::ProtocolError> for ChannelError {
    fn from(err: piclink_protocol::ProtocolError) -> Self {
        match err {
            piclink_protocol::ProtocolError::UnknownType(t) => Self::UnknownMessage(t),
            other => Self::Protocol(other.to_string()),
        }
    }
}
