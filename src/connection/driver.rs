//! Receive loop pulling packets from a provider into a sink

use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use super::PacketSink;
use crate::provider::Provider;

/// How the receive loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverExit {
    /// Cancellation token fired
    Cancelled,
    /// Peer closed the stream
    Closed,
    /// Connection-level failure
    Failed(String),
}

impl DriverExit {
    /// Reason to report for an unrequested stop, `None` when cancelled
    pub fn loss_reason(&self) -> Option<String> {
        match self {
            DriverExit::Cancelled => None,
            DriverExit::Closed => Some("server closed the connection".to_string()),
            DriverExit::Failed(reason) => Some(reason.clone()),
        }
    }
}

/// Run the receive loop until cancelled or the connection fails
///
/// Decode errors skip a single packet. Anything else ends the loop; there is
/// no reconnect here.
pub async fn run<P>(mut provider: P, sink: &dyn PacketSink, cancel: &CancellationToken) -> DriverExit
where
    P: Provider,
{
    let peer = provider.peer();
    info!(%peer, "Receive loop started");
    let mut received = 0u64;
    let mut skipped = 0u64;

    let exit = loop {
        // Cancellation is polled first so a pending read is dropped promptly
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = provider.next_packet() => Some(result),
        };

        let Some(result) = result else {
            break DriverExit::Cancelled;
        };

        match result {
            Ok(Some(packet)) => {
                received += 1;
                trace!(tick = packet.tick(), received, "Handing packet to sink");
                if let Err(e) = sink.ingest(packet) {
                    error!(%peer, "Sink rejected packet: {}", e);
                    break DriverExit::Failed(e.to_string());
                }
            }
            Ok(None) => break DriverExit::Closed,
            Err(e) if e.is_transient() => {
                skipped += 1;
                warn!(%peer, skipped, "Skipping malformed packet: {}", e);
            }
            Err(e) => {
                error!(%peer, "Connection failed: {}", e);
                break DriverExit::Failed(e.to_string());
            }
        }
    };

    info!(%peer, received, skipped, ?exit, "Receive loop ended");
    exit
}
