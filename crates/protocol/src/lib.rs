//! Wire protocol types for PicLink phone-to-PC photo transfers.
//!
//! Defines the [`ControlMessage`] vocabulary exchanged on the data channel,
//! the launch URL contract that selects the sender or receiver role, and
//! the share-address construction used by the QR handshake.

pub mod address;
pub mod message;

pub use address::{LaunchMode, local_reachable_ip, share_url};
pub use message::{ControlMessage, FileMessage, PeerId};

/// Length of a peer identifier in characters (32 lowercase hex digits).
pub const PEER_ID_LEN: usize = 32;

/// Errors produced while encoding, decoding, or addressing.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("launch URL selects upload mode but carries no peer identifier")]
    MissingPeer,

    #[error("unrecognized message type: {0:?}")]
    UnknownType(String),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("invalid peer identifier: {0:?}")]
    InvalidPeerId(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("no externally reachable network address available")]
    NoReachableAddress,
}
