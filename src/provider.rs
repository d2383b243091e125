//! Provider trait for packet sources

use crate::Result;
use crate::types::EmostatePacket;

/// Trait for emostate packet sources
///
/// A provider owns its transport for its whole lifetime and is driven by the
/// connection worker's receive loop.
#[async_trait::async_trait]
pub trait Provider: Send + 'static {
    /// Get the next packet
    ///
    /// Returns:
    /// - `Ok(Some(packet))` - Packet decoded
    /// - `Ok(None)` - Peer closed the stream
    /// - `Err(e)` where `e.is_transient()` - One bad packet, keep reading
    /// - `Err(e)` otherwise - Connection-level failure
    async fn next_packet(&mut self) -> Result<Option<EmostatePacket>>;

    /// Human readable description of the remote end
    fn peer(&self) -> String;
}
