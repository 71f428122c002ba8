//! Session state machines for phone-to-PC batch transfers.
//!
//! The receiver walks `initializing → waiting → connected → receiving →
//! done`, the sender `connecting → connected → sending → done`, each with
//! a parallel terminal `error` state. All protocol steps are reactions to
//! channel events or explicit user triggers; nothing blocks between items
//! beyond the sender's pacing.

pub mod receiver;
pub mod sender;

pub use receiver::{
    ReceiveError, ReceiveProgress, ReceiverConfig, ReceiverSession, ReceiverState,
    UnknownMessagePolicy,
};
pub use sender::{OutgoingFile, SendError, SenderConfig, SenderSession, SenderState};
