//! Peer endpoints: identifier assignment, accept, and dial.

use std::net::SocketAddr;

use tokio::io::{BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use piclink_protocol::PeerId;

use crate::wire::{
    CONNECT_BUSY, CONNECT_OK, CONNECT_REJECTED, read_connect_response, read_peer_id,
    write_connect_response, write_peer_id,
};
use crate::{
    CHANNEL_BUFFER_SIZE, CONNECT_TIMEOUT, ChannelError, HANDSHAKE_TIMEOUT, TcpChannel,
    identifier::assign_peer_id,
};

/// One participant's ephemeral connection point.
///
/// Bound once per role instance; the broker-assigned identifier lives as
/// long as the endpoint. Dropping the endpoint (navigation away, explicit
/// close) tears the connection point down.
pub struct PeerEndpoint {
    id: PeerId,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl PeerEndpoint {
    /// Binds a listener (port 0 = OS-assigned) and assigns an identifier.
    pub async fn bind(port: u16) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        let local_addr = listener.local_addr()?;
        let id = assign_peer_id();

        info!(%id, port = local_addr.port(), "peer endpoint bound");

        Ok(Self {
            id,
            listener,
            local_addr,
        })
    }

    /// The broker-assigned identifier for this endpoint.
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Accepts exactly one inbound connection whose handshake carries this
    /// endpoint's identifier.
    ///
    /// Dialers presenting a wrong identifier are rejected and the wait
    /// continues. Once a session is accepted, the listener stays alive in
    /// a background task that answers any further dialer with a busy
    /// response until `cancel` fires: a second connection attempt never
    /// disturbs the active session.
    pub async fn accept(self, cancel: CancellationToken) -> Result<TcpChannel, ChannelError> {
        let Self { id, listener, .. } = self;

        loop {
            let (stream, addr) = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChannelError::Cancelled),
                result = listener.accept() => result?,
            };

            match handshake_inbound(&id, stream).await {
                Ok(Some(channel)) => {
                    info!(%addr, "inbound session accepted");
                    tokio::spawn(reject_extra_connections(listener, cancel));
                    return Ok(channel);
                }
                Ok(None) => {
                    warn!(%addr, "rejected dialer with wrong identifier");
                }
                Err(e) => {
                    warn!(%addr, error = %e, "handshake failed, still waiting");
                }
            }
        }
    }
}

/// Runs the inbound handshake. `Ok(None)` means the identifier mismatched
/// and the dialer was told so.
async fn handshake_inbound(
    id: &PeerId,
    stream: TcpStream,
) -> Result<Option<TcpChannel>, ChannelError> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::with_capacity(CHANNEL_BUFFER_SIZE, read_half);
    let mut writer = BufWriter::with_capacity(CHANNEL_BUFFER_SIZE, write_half);

    let received = match tokio::time::timeout(HANDSHAKE_TIMEOUT, read_peer_id(&mut reader)).await {
        Ok(result) => result?,
        Err(_) => return Err(ChannelError::Timeout),
    };

    if !id.matches(&received) {
        write_connect_response(&mut writer, CONNECT_REJECTED).await?;
        return Ok(None);
    }

    write_connect_response(&mut writer, CONNECT_OK).await?;
    Ok(Some(TcpChannel::new(reader, writer)))
}

/// Answers every late dialer with a busy byte until cancellation.
async fn reject_extra_connections(listener: TcpListener, cancel: CancellationToken) {
    loop {
        let (stream, addr) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = listener.accept() => match result {
                Ok(conn) => conn,
                Err(e) => {
                    debug!(error = %e, "accept failed while busy");
                    continue;
                }
            },
        };

        warn!(%addr, "second connection attempt while session active, answering busy");
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut writer = BufWriter::new(write_half);
        // Drain the dialer's handshake so the busy byte reaches it cleanly.
        let _ = tokio::time::timeout(HANDSHAKE_TIMEOUT, read_peer_id(&mut reader)).await;
        if let Err(e) = write_connect_response(&mut writer, CONNECT_BUSY).await {
            debug!(error = %e, "failed to send busy response");
        }
    }
}

/// Dials a receiver endpoint and performs the identifier handshake.
pub async fn dial(
    host: &str,
    port: u16,
    peer: &PeerId,
    cancel: &CancellationToken,
) -> Result<TcpChannel, ChannelError> {
    let stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ChannelError::Cancelled),
        result = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port))) => {
            match result {
                Ok(Ok(s)) => s,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(ChannelError::Timeout),
            }
        }
    };

    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::with_capacity(CHANNEL_BUFFER_SIZE, read_half);
    let mut writer = BufWriter::with_capacity(CHANNEL_BUFFER_SIZE, write_half);

    write_peer_id(&mut writer, peer.as_str()).await?;

    let response =
        match tokio::time::timeout(HANDSHAKE_TIMEOUT, read_connect_response(&mut reader)).await {
            Ok(result) => result?,
            Err(_) => return Err(ChannelError::Timeout),
        };

    match response {
        CONNECT_OK => {
            info!(host, port, "connected to receiver");
            Ok(TcpChannel::new(reader, writer))
        }
        CONNECT_REJECTED => Err(ChannelError::Rejected),
        CONNECT_BUSY => Err(ChannelError::Busy),
        other => Err(ChannelError::Protocol(format!(
            "unexpected handshake response: {other:#04x}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageChannel;
    use piclink_protocol::ControlMessage;

    #[tokio::test]
    async fn dial_and_accept_establish_a_channel() {
        let endpoint = PeerEndpoint::bind(0).await.unwrap();
        let id = endpoint.id().clone();
        let port = endpoint.port();
        let cancel = CancellationToken::new();

        let accept = tokio::spawn(endpoint.accept(cancel.clone()));
        let mut sender = dial("127.0.0.1", port, &id, &cancel).await.unwrap();
        let mut receiver = accept.await.unwrap().unwrap();

        sender.send(&ControlMessage::Done).await.unwrap();
        assert_eq!(receiver.recv().await.unwrap(), Some(ControlMessage::Done));
    }

    #[tokio::test]
    async fn wrong_identifier_is_rejected() {
        let endpoint = PeerEndpoint::bind(0).await.unwrap();
        let port = endpoint.port();
        let right_id = endpoint.id().clone();
        let wrong_id = assign_peer_id();
        let cancel = CancellationToken::new();

        let accept = tokio::spawn(endpoint.accept(cancel.clone()));

        let result = dial("127.0.0.1", port, &wrong_id, &cancel).await;
        assert!(matches!(result, Err(ChannelError::Rejected)));

        // The endpoint keeps waiting; a correct dial still succeeds.
        let mut sender = dial("127.0.0.1", port, &right_id, &cancel).await.unwrap();
        let mut receiver = accept.await.unwrap().unwrap();
        sender.send(&ControlMessage::Done).await.unwrap();
        assert_eq!(receiver.recv().await.unwrap(), Some(ControlMessage::Done));
    }

    #[tokio::test]
    async fn second_dialer_gets_busy() {
        let endpoint = PeerEndpoint::bind(0).await.unwrap();
        let id = endpoint.id().clone();
        let port = endpoint.port();
        let cancel = CancellationToken::new();

        let accept = tokio::spawn(endpoint.accept(cancel.clone()));
        let _first = dial("127.0.0.1", port, &id, &cancel).await.unwrap();
        let _receiver = accept.await.unwrap().unwrap();

        let second = dial("127.0.0.1", port, &id, &cancel).await;
        assert!(matches!(second, Err(ChannelError::Busy)));

        cancel.cancel();
    }

    #[tokio::test]
    async fn cancellation_aborts_accept() {
        let endpoint = PeerEndpoint::bind(0).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = endpoint.accept(cancel).await;
        assert!(matches!(result, Err(ChannelError::Cancelled)));
    }
}
