//! PicLink phone sender entry point.
//!
//! Takes the scanned launch address plus the photos to upload, dials the
//! receiver named in the address, and streams the batch.

use std::path::PathBuf;

use anyhow::{Context, bail};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use piclink_data_channel::dial;
use piclink_protocol::LaunchMode;
use piclink_transfer::{OutgoingFile, SenderConfig, SenderSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(address) = args.next() else {
        bail!("usage: piclink-phone <scanned-address> <photo>...");
    };
    let paths: Vec<PathBuf> = args.map(PathBuf::from).collect();
    if paths.is_empty() {
        bail!("no photos given; usage: piclink-phone <scanned-address> <photo>...");
    }

    let (peer, host, port) = match LaunchMode::from_url(&address)? {
        LaunchMode::Send { peer, host, port } => (peer, host, port),
        LaunchMode::Receive => {
            bail!("the scanned address names no receiver to send to; rescan on the PC")
        }
    };

    info!(%peer, host, port, "dialing receiver");

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let (mut session, _state_rx, mut sent_rx) = SenderSession::connect(
        SenderConfig::default(),
        cancel.clone(),
        dial(&host, port, &peer, &cancel),
    )
    .await
    .context("could not connect; rescan the address and try again")?;

    for path in &paths {
        let file = OutgoingFile::from_path(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        info!(name = %file.name, size = file.data.len(), "photo selected");
        session.select(file);
    }

    let total = paths.len() as u32;
    tokio::spawn(async move {
        while sent_rx.changed().await.is_ok() {
            let sent = *sent_rx.borrow();
            info!(sent, total, "progress");
        }
    });

    let sent = session.send_batch().await.context("transfer failed")?;
    session.close().await;

    println!("Sent {sent} photo(s).");
    Ok(())
}
