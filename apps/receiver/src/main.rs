//! PicLink PC receiver entry point.
//!
//! Binds a peer endpoint, publishes the scannable share address, receives
//! one photo batch from the phone, and writes the files to disk. When an
//! OCR backend is configured, the recognized text is assembled into a
//! document alongside the photos.

mod config;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use piclink_data_channel::PeerEndpoint;
use piclink_docgen::{DocumentWriter, HtmlWriter, PlainTextWriter, assemble};
use piclink_ocr::{HostedVisionEngine, OcrEngine, TextBlock};
use piclink_protocol::{FileMessage, local_reachable_ip, share_url};
use piclink_transfer::{ReceiveProgress, ReceiverConfig, ReceiverSession};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting PicLink PC");

    let config = match Config::load() {
        Ok(c) => {
            info!(name = %c.name, "configuration loaded");
            c
        }
        Err(e) => {
            warn!(error = %e, "failed to load config, using defaults");
            Config::default()
        }
    };

    let endpoint = PeerEndpoint::bind(config.port).await?;

    // The CLI has no page host of its own, so the base address is loopback
    // and the share URL substitutes the reachable host.
    let external_host = match &config.external_host {
        Some(host) => host.clone(),
        None => local_reachable_ip()
            .context("no reachable network address; set external_host in the config")?
            .to_string(),
    };
    let base = Url::parse(&format!("http://localhost:{}/", endpoint.port()))?;
    let share = share_url(&base, endpoint.id(), Some(&external_host))?;

    info!(url = %share, "share address published");
    println!("Scan this address with your phone:\n\n    {share}\n");

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let receiver_config = ReceiverConfig {
        partial_on_close: config.partial_on_close,
        ..ReceiverConfig::default()
    };
    let (session, _state_rx, mut progress_rx) =
        ReceiverSession::new(receiver_config, cancel.clone());

    tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let ReceiveProgress {
                received,
                announced_total,
            } = *progress_rx.borrow();
            info!(received, total = announced_total, "receiving");
        }
    });

    let files = session
        .run(endpoint.accept(cancel.clone()))
        .await
        .context("transfer failed")?;

    let output_dir = PathBuf::from(&config.output_dir);
    tokio::fs::create_dir_all(&output_dir).await?;

    let mut saved = Vec::new();
    for file in &files {
        let path = unique_path(&output_dir, &sanitize_file_name(&file.name));
        tokio::fs::write(&path, &file.data).await?;
        info!(path = %path.display(), size = file.data.len(), "photo saved");
        saved.push(path);
    }
    println!("Received {} photo(s) into {}", saved.len(), output_dir.display());

    if let Some(ocr) = &config.ocr {
        let engine = HostedVisionEngine::new(&ocr.endpoint, &ocr.model, ocr.api_key.clone());
        let document = run_ocr_pipeline(&engine, &files).await;
        let (bytes, extension) = render_document(&document, &config.document_format)?;

        let doc_path = output_dir.join(format!("piclink-document.{extension}"));
        tokio::fs::write(&doc_path, bytes).await?;
        info!(path = %doc_path.display(), "document assembled");
        println!("Document written to {}", doc_path.display());
    }

    Ok(())
}

/// Recognizes every received image and assembles the document.
///
/// A backend failure for one image degrades that page to a placeholder
/// note; it never aborts the batch.
async fn run_ocr_pipeline<E: OcrEngine>(
    engine: &E,
    files: &[FileMessage],
) -> piclink_docgen::Document {
    let mut pages: Vec<Vec<TextBlock>> = Vec::new();
    for file in files {
        if !file.mime_type.starts_with("image/") {
            warn!(name = %file.name, mime = %file.mime_type, "skipping non-image file");
            continue;
        }
        match engine.recognize(&file.data, &file.mime_type).await {
            Ok(blocks) => {
                info!(name = %file.name, blocks = blocks.len(), "image recognized");
                pages.push(blocks);
            }
            Err(e) => {
                warn!(name = %file.name, error = %e, "OCR backend unreachable for image");
                pages.push(vec![TextBlock::raw(format!(
                    "[unrecognized image: {}]",
                    file.name
                ))]);
            }
        }
    }
    assemble(&pages)
}

fn render_document(
    document: &piclink_docgen::Document,
    format: &str,
) -> anyhow::Result<(Vec<u8>, &'static str)> {
    match format {
        "txt" => Ok((PlainTextWriter.write(document)?, PlainTextWriter.extension())),
        _ => Ok((HtmlWriter.write(document)?, HtmlWriter.extension())),
    }
}

/// Reduces a sender-supplied display name to a safe bare file name.
///
/// Directory components, traversal, and Windows drive prefixes are
/// stripped; an empty result becomes `photo`.
fn sanitize_file_name(name: &str) -> String {
    let flattened = name.replace('\\', "/");
    let candidate = Path::new(&flattened)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cleaned: String = candidate
        .chars()
        .filter(|c| !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "photo".into()
    } else {
        cleaned
    }
}

/// Avoids clobbering an existing file by appending a counter.
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    for counter in 1.. {
        let next = match ext {
            Some(ext) => dir.join(format!("{stem}-{counter}.{ext}")),
            None => dir.join(format!("{stem}-{counter}")),
        };
        if !next.exists() {
            return next;
        }
    }
    unreachable!("counter space exhausted");
}
