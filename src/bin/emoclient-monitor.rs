//! Connects to an emostate server and logs every client event.
//!
//! Runs until the connection drops, `--limit` packets arrive, or Ctrl-C.
//!
//! ```text
//! emoclient-monitor --host 192.168.1.20 --port 1726
//! RUST_LOG=emoclient=debug emoclient-monitor --config client.yaml
//! ```

use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::Context;
use clap::Parser;
use emoclient::{ClientConfig, ClientEvent, ClientModel, Emotion, Expression};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "emoclient-monitor", about = "Log events from an emostate server")]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Stop after this many packets
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let client = ClientModel::new(config)?;
    let _teardown = client.teardown_guard();

    let (done_tx, done_rx) = mpsc::channel();

    // Ctrl-C unwinds through `main` so the teardown guard still runs
    let interrupted = done_tx.clone();
    ctrlc::set_handler(move || {
        info!("Interrupted, shutting down");
        let _ = interrupted.send(());
    })
    .context("installing Ctrl-C handler")?;
    let reader = client.clone();
    let limit = args.limit;
    client.subscribe(move |event: &ClientEvent| match event {
        ClientEvent::Started { peer } => info!(%peer, "Started"),
        ClientEvent::Shutdown { reason } => {
            info!(?reason, "Shutdown");
            let _ = done_tx.send(());
        }
        ClientEvent::ValuesAdded { tick } => {
            let (count, smile, focus) = reader.with_store(|store| {
                (
                    store.len(),
                    store.buffer(Expression::Smile).last().and_then(|v| v.value),
                    store.buffer(Emotion::Focus).last().and_then(|v| v.value),
                )
            });
            info!(tick, count, ?smile, ?focus, "Packet");
            if limit.is_some_and(|limit| count >= limit) {
                let _ = done_tx.send(());
            }
        }
        ClientEvent::ValuesReset => warn!("Server restarted its session, buffers reset"),
        ClientEvent::ValuesChanged => {}
    });

    client.connect().with_context(|| format!("connecting to {}:{}", client.host(), client.port()))?;

    // Wait for the connection to drop, the packet limit, or Ctrl-C
    let _ = done_rx.recv();
    info!(packets = client.packets_count(), "Done");
    Ok(())
}
