//! Core data types for the emostate client.
//!
//! - [`EmostatePacket`] is one immutable sample with a tick and per-channel readings
//! - [`ChannelId`] names one of the fixed set of expression and emotion channels
//! - [`ChannelBuffer`] is the insertion-ordered series of [`ValueTuple`]s for a channel
//! - [`PacketStore`] keeps all buffers in lockstep with the packet list
//! - [`ClientEvent`] is what listeners receive
//!
//! ## Usage Example
//!
//! ```rust
//! use emoclient::types::{EmostatePacket, Expression, PacketStore, ValueTuple};
//!
//! let packet = EmostatePacket::from_values(7, [(Expression::Smile, 0.25)]);
//! assert_eq!(packet.expression(Expression::Smile), Some(0.25));
//! assert_eq!(packet.expression(Expression::Blink), None);
//!
//! let store = PacketStore::new();
//! assert!(store.buffer(Expression::Smile).is_empty());
//! # let _ = ValueTuple::new(0, None);
//! ```

mod buffer;
mod channel;
mod event;
mod packet;

pub use buffer::{ChannelBuffer, PacketStore};
pub use channel::{ChannelId, Emotion, Expression};
pub use event::{ClientEvent, ShutdownReason};
pub use packet::{EmostatePacket, ValueTuple};
