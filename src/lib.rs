//! Client-side ingestion and fan-out of emostate sensor packets.
//!
//! emoclient connects to an emostate server over TCP, receives timestamped
//! packets on a dedicated thread, keeps a rolling time series per channel, and
//! notifies listeners of connection and data changes.
//!
//! # Features
//!
//! - **Lifecycle**: `connect`/`disconnect` with bounded shutdown and host switching
//! - **Buffering**: one aligned series per expression and emotion channel
//! - **Session restarts**: a decreasing tick resets all buffers
//! - **Listeners**: synchronous, ordered callbacks or an async event stream
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use emoclient::{ClientConfig, ClientEvent, ClientModel, Emotion};
//!
//! fn main() -> emoclient::Result<()> {
//!     let client = ClientModel::new(ClientConfig::default())?;
//!     let _teardown = client.teardown_guard();
//!
//!     let reader = client.clone();
//!     client.subscribe(move |event: &ClientEvent| match event {
//!         ClientEvent::ValuesAdded { tick } => {
//!             let focus = reader.emotion_buffer(Emotion::Focus);
//!             println!("tick {tick}: focus {:?}", focus.last().and_then(|v| v.value));
//!         }
//!         ClientEvent::Shutdown { reason } => println!("stopped: {reason:?}"),
//!         _ => {}
//!     });
//!
//!     client.connect()?;
//!     std::thread::sleep(std::time::Duration::from_secs(10));
//!     Ok(())
//! }
//! ```

mod error;
#[cfg(test)]
pub mod test_utils;

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod provider;
pub mod providers;
pub mod types;

pub use client::{ClientModel, ConnectionState, Listener, ListenerId, TeardownGuard};
pub use config::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use error::*;
pub use types::{
    ChannelBuffer, ChannelId, ClientEvent, Emotion, EmostatePacket, Expression, PacketStore,
    ShutdownReason, ValueTuple,
};
