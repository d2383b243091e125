//! Inbound measurement samples

use std::collections::BTreeMap;

use super::{ChannelId, Emotion, Expression};

/// One timestamped sample from the emostate server
///
/// Packets are immutable once constructed. A channel missing from `values`
/// means the server did not report it for this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EmostatePacket {
    tick: i64,
    values: BTreeMap<ChannelId, f64>,
}

impl EmostatePacket {
    /// Create a new packet
    pub fn new(tick: i64, values: BTreeMap<ChannelId, f64>) -> Self {
        Self { tick, values }
    }

    /// Create a packet from `(channel, value)` pairs
    pub fn from_values<I, C>(tick: i64, values: I) -> Self
    where
        I: IntoIterator<Item = (C, f64)>,
        C: Into<ChannelId>,
    {
        Self { tick, values: values.into_iter().map(|(c, v)| (c.into(), v)).collect() }
    }

    /// Sequence marker used to detect session restarts
    pub fn tick(&self) -> i64 {
        self.tick
    }

    /// Reading for a channel, if the server reported one
    pub fn value(&self, channel: impl Into<ChannelId>) -> Option<f64> {
        self.values.get(&channel.into()).copied()
    }

    pub fn expression(&self, expression: Expression) -> Option<f64> {
        self.value(expression)
    }

    pub fn emotion(&self, emotion: Emotion) -> Option<f64> {
        self.value(emotion)
    }

    /// All reported readings in channel order
    pub fn values(&self) -> &BTreeMap<ChannelId, f64> {
        &self.values
    }
}

/// One sample of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueTuple {
    pub tick: i64,
    /// `None` when the packet carried no reading for the channel
    pub value: Option<f64>,
}

impl ValueTuple {
    pub fn new(tick: i64, value: Option<f64>) -> Self {
        Self { tick, value }
    }
}
