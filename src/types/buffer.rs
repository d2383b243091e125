//! Per-channel time series storage

use std::ops::Deref;
use std::sync::Arc;

use super::{ChannelId, EmostatePacket, ValueTuple};

/// Insertion-ordered samples for a single channel
///
/// Append-only except for [`ChannelBuffer::clear`]. Outside the crate the
/// buffer is only reachable through shared references or snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelBuffer {
    values: Vec<ValueTuple>,
}

impl ChannelBuffer {
    pub(crate) fn push(&mut self, tuple: ValueTuple) {
        self.values.push(tuple);
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
    }

    /// Most recent sample
    pub fn last(&self) -> Option<&ValueTuple> {
        self.values.last()
    }

    /// Copy the samples out
    pub fn to_vec(&self) -> Vec<ValueTuple> {
        self.values.clone()
    }
}

impl Deref for ChannelBuffer {
    type Target = [ValueTuple];

    fn deref(&self) -> &Self::Target {
        &self.values
    }
}

/// Everything ingested since the last reset
///
/// Keeps every channel buffer at the same length as the packet list.
#[derive(Debug)]
pub struct PacketStore {
    packets: Vec<Arc<EmostatePacket>>,
    newest: Option<Arc<EmostatePacket>>,
    buffers: [ChannelBuffer; ChannelId::COUNT],
}

impl Default for PacketStore {
    fn default() -> Self {
        Self {
            packets: Vec::new(),
            newest: None,
            buffers: std::array::from_fn(|_| ChannelBuffer::default()),
        }
    }
}

impl PacketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `tick` would start a new session (it is earlier than the newest packet)
    pub fn is_restart(&self, tick: i64) -> bool {
        self.newest.as_ref().is_some_and(|newest| tick < newest.tick())
    }

    /// Append a packet, contributing one sample to every channel
    pub(crate) fn append(&mut self, packet: Arc<EmostatePacket>) {
        for channel in ChannelId::ALL {
            self.buffers[channel.index()].push(ValueTuple::new(packet.tick(), packet.value(channel)));
        }
        self.packets.push(Arc::clone(&packet));
        self.newest = Some(packet);
    }

    pub(crate) fn clear(&mut self) {
        self.newest = None;
        self.packets.clear();
        for buffer in &mut self.buffers {
            buffer.clear();
        }
    }

    pub fn buffer(&self, channel: impl Into<ChannelId>) -> &ChannelBuffer {
        &self.buffers[channel.into().index()]
    }

    pub fn packets(&self) -> &[Arc<EmostatePacket>] {
        &self.packets
    }

    pub fn newest(&self) -> Option<&Arc<EmostatePacket>> {
        self.newest.as_ref()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}
