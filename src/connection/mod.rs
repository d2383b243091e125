//! Connection layer: the receive thread and the loop it runs.
//!
//! A [`ConnectionWorker`] owns exactly one server connection for its whole
//! lifetime. Packets flow out through a [`PacketSink`], which the client model
//! implements for each connection generation.

pub mod driver;
pub mod worker;

pub use driver::DriverExit;
pub use worker::{ConnectionWorker, Startup};

use crate::Result;
use crate::types::EmostatePacket;

/// Ingestion target for a running worker
pub trait PacketSink: Send + Sync + 'static {
    /// Apply one decoded packet
    ///
    /// An error stops the receive loop.
    fn ingest(&self, packet: EmostatePacket) -> Result<()>;

    /// Report that the loop ended without being asked to
    fn connection_lost(&self, generation: u64, reason: String);
}
