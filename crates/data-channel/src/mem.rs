//! In-memory channel pair.
//!
//! Backs tests and any same-process wiring. Unlike the TCP transport, the
//! queue depth is observable, so [`MessageChannel::buffered_amount`]
//! returns the bytes a peer has sent that the other side has not yet
//! consumed, which is the signal the sender's pacing prefers over its
//! fixed delay.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use piclink_protocol::ControlMessage;

use crate::{ChannelError, MessageChannel};

/// One side of an in-memory channel pair.
pub struct MemoryChannel {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    /// Bytes this side has sent but the peer has not yet received.
    outbound: Arc<AtomicU64>,
    /// Bytes the peer has sent that this side has not yet received.
    inbound: Arc<AtomicU64>,
}

/// Creates a connected pair of in-memory channels.
pub fn memory_pair() -> (MemoryChannel, MemoryChannel) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    let a_to_b = Arc::new(AtomicU64::new(0));
    let b_to_a = Arc::new(AtomicU64::new(0));

    let a = MemoryChannel {
        tx: Some(a_tx),
        rx: b_rx,
        outbound: Arc::clone(&a_to_b),
        inbound: Arc::clone(&b_to_a),
    };
    let b = MemoryChannel {
        tx: Some(b_tx),
        rx: a_rx,
        outbound: b_to_a,
        inbound: a_to_b,
    };
    (a, b)
}

impl MemoryChannel {
    /// Injects a raw frame payload, bypassing message encoding.
    ///
    /// Lets tests exercise unknown-type and malformed-frame handling.
    pub fn send_raw(&self, payload: Vec<u8>) -> Result<(), ChannelError> {
        let tx = self.tx.as_ref().ok_or(ChannelError::Closed)?;
        self.outbound
            .fetch_add(payload.len() as u64, Ordering::SeqCst);
        tx.send(payload).map_err(|_| ChannelError::Closed)
    }
}

impl MessageChannel for MemoryChannel {
    async fn send(&mut self, msg: &ControlMessage) -> Result<(), ChannelError> {
        let payload = msg.encode()?;
        self.send_raw(payload)
    }

    async fn recv(&mut self) -> Result<Option<ControlMessage>, ChannelError> {
        let Some(payload) = self.rx.recv().await else {
            return Ok(None);
        };
        self.inbound
            .fetch_sub(payload.len() as u64, Ordering::SeqCst);
        Ok(Some(ControlMessage::decode(&payload)?))
    }

    fn buffered_amount(&self) -> Option<u64> {
        Some(self.outbound.load(Ordering::SeqCst))
    }

    async fn close(&mut self) {
        self.tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piclink_protocol::FileMessage;

    fn sample(index: u32) -> ControlMessage {
        ControlMessage::File(FileMessage {
            name: format!("{index}.jpg"),
            mime_type: "image/jpeg".into(),
            data: vec![0u8; 8],
            index,
            total: 2,
        })
    }

    #[tokio::test]
    async fn pair_delivers_in_order() {
        let (mut a, mut b) = memory_pair();
        a.send(&sample(0)).await.unwrap();
        a.send(&sample(1)).await.unwrap();
        a.send(&ControlMessage::Done).await.unwrap();

        assert_eq!(b.recv().await.unwrap(), Some(sample(0)));
        assert_eq!(b.recv().await.unwrap(), Some(sample(1)));
        assert_eq!(b.recv().await.unwrap(), Some(ControlMessage::Done));
    }

    #[tokio::test]
    async fn buffered_amount_tracks_queue_depth() {
        let (mut a, mut b) = memory_pair();
        assert_eq!(a.buffered_amount(), Some(0));

        a.send(&sample(0)).await.unwrap();
        let queued = a.buffered_amount().unwrap();
        assert!(queued > 0);

        b.recv().await.unwrap();
        assert_eq!(a.buffered_amount(), Some(0));
    }

    #[tokio::test]
    async fn close_yields_none_on_peer() {
        let (mut a, mut b) = memory_pair();
        a.send(&ControlMessage::Done).await.unwrap();
        a.close().await;

        assert_eq!(b.recv().await.unwrap(), Some(ControlMessage::Done));
        assert!(b.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (mut a, _b) = memory_pair();
        a.close().await;
        let err = a.send(&ControlMessage::Done).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }

    #[tokio::test]
    async fn raw_injection_surfaces_unknown_type() {
        let (a, mut b) = memory_pair();
        a.send_raw(br#"{"type":"ping"}"#.to_vec()).unwrap();

        let err = b.recv().await.unwrap_err();
        assert!(matches!(err, ChannelError::UnknownMessage(t) if t == "ping"));
    }

    #[tokio::test]
    async fn channel_stays_usable_after_unknown_frame() {
        let (mut a, mut b) = memory_pair();
        a.send_raw(br#"{"type":"ping"}"#.to_vec()).unwrap();
        a.send(&ControlMessage::Done).await.unwrap();

        assert!(b.recv().await.is_err());
        assert_eq!(b.recv().await.unwrap(), Some(ControlMessage::Done));
    }
}
