//! Data channel between the phone and the PC.
//!
//! Plays the role of the external connection broker: assigns opaque peer
//! identifiers, accepts exactly one inbound connection per endpoint, and
//! provides a reliable, ordered, bidirectional [`MessageChannel`] once two
//! peers connect.
//!
//! # Wire format
//!
//! ```text
//! HANDSHAKE (sender -> receiver): [32 bytes: peer identifier, hex ASCII]
//! RESPONSE (receiver -> sender):  [1 byte: 0x01=OK, 0x00=rejected, 0x02=busy]
//!
//! PER MESSAGE (either direction):
//!   [4 bytes BE: frame_len]
//!   [frame_len bytes: ControlMessage JSON]
//! ```

pub mod channel;
pub mod endpoint;
pub mod error;
pub mod identifier;
pub mod mem;
pub mod wire;

pub use channel::{FramedChannel, MessageChannel, TcpChannel};
pub use endpoint::{PeerEndpoint, dial};
pub use error::ChannelError;
pub use identifier::assign_peer_id;
pub use mem::{MemoryChannel, memory_pair};

use std::time::Duration;

/// Maximum encoded frame size (covers one photo plus base64 overhead).
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Read/write buffer size for the TCP transport.
pub const CHANNEL_BUFFER_SIZE: usize = 256 * 1024;

/// Timeout for the outbound connection attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the identifier handshake.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
