//! Wire codec for emostate packets
//!
//! The server sends one JSON object per line:
//!
//! ```text
//! {"tick": 12, "expressions": {"smile": 0.4}, "emotions": {"focus": 0.7}}
//! ```
//!
//! Both maps are optional and unknown keys are ignored. Blank lines are
//! keep-alives and decode to `None`.
//!
//! [`LineDecoder`] splits the byte stream into lines for the TCP provider.

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::codec::Decoder;

use crate::types::{ChannelId, Emotion, EmostatePacket, Expression};
use crate::{ClientError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct WirePacket {
    tick: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    expressions: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    emotions: BTreeMap<String, f64>,
}

/// Decode a single line into a packet
pub fn decode_line(line: &str) -> Result<Option<EmostatePacket>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let wire: WirePacket = serde_json::from_str(line)
        .map_err(|e| ClientError::decode_error("emostate packet", e.to_string()))?;

    let mut values = BTreeMap::new();
    for expression in Expression::ALL {
        if let Some(value) = wire.expressions.get(expression.as_str()) {
            values.insert(ChannelId::Expression(expression), checked(*value, expression.as_str())?);
        }
    }
    for emotion in Emotion::ALL {
        if let Some(value) = wire.emotions.get(emotion.as_str()) {
            values.insert(ChannelId::Emotion(emotion), checked(*value, emotion.as_str())?);
        }
    }

    Ok(Some(EmostatePacket::new(wire.tick, values)))
}

/// Encode a packet as a single line (without the trailing newline)
///
/// Non-finite values have no JSON representation and are left out, so the
/// line always decodes; those channels read back as absent.
pub fn encode_packet(packet: &EmostatePacket) -> String {
    let mut wire =
        WirePacket { tick: packet.tick(), expressions: BTreeMap::new(), emotions: BTreeMap::new() };

    for (channel, value) in packet.values().iter().filter(|(_, value)| value.is_finite()) {
        match channel {
            ChannelId::Expression(e) => wire.expressions.insert(e.as_str().to_string(), *value),
            ChannelId::Emotion(e) => wire.emotions.insert(e.as_str().to_string(), *value),
        };
    }

    // String keys and finite values only, so serialization cannot fail
    serde_json::to_string(&wire).unwrap_or_default()
}

/// Splits a byte stream into lines, surviving bad ones
///
/// A line longer than `max_length` or one that is not UTF-8 comes out as an
/// `Err` item and decoding resumes at the next line. Only I/O errors end the
/// stream. Trailing `\r` is stripped.
#[derive(Debug)]
pub struct LineDecoder {
    max_length: usize,
    /// Where the newline search resumes in a partial line
    next_index: usize,
    /// Dropping the rest of an overlong line
    discarding: bool,
}

impl LineDecoder {
    pub fn new(max_length: usize) -> Self {
        Self { max_length, next_index: 0, discarding: false }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Decoder for LineDecoder {
    type Item = Result<String>;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> std::io::Result<Option<Self::Item>> {
        loop {
            let read_to = buf.len().min(self.max_length.saturating_add(1));
            let newline = buf[self.next_index..read_to].iter().position(|b| *b == b'\n');

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    let _ = buf.split_to(offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                    return Ok(Some(Err(overlong_line(self.max_length))));
                }
                (true, None) => {
                    let _ = buf.split_to(read_to);
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let line = buf.split_to(end + 1);
                    return Ok(Some(line_text(&line[..end])));
                }
                (false, None) if buf.len() > self.max_length => {
                    self.discarding = true;
                    self.next_index = 0;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> std::io::Result<Option<Self::Item>> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }

        self.next_index = 0;
        if self.discarding {
            // Overlong line cut short by the end of the stream
            self.discarding = false;
            buf.clear();
            return Ok(Some(Err(overlong_line(self.max_length))));
        }
        if buf.is_empty() {
            return Ok(None);
        }

        let line = buf.split_to(buf.len());
        Ok(Some(line_text(&line)))
    }
}

fn line_text(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    std::str::from_utf8(bytes).map(str::to_owned).map_err(|e| {
        ClientError::decode_error("emostate stream", format!("line is not valid UTF-8: {e}"))
    })
}

fn overlong_line(max_length: usize) -> ClientError {
    ClientError::decode_error(
        "emostate stream",
        format!("line exceeds maximum frame length of {max_length} bytes"),
    )
}

fn checked(value: f64, channel: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ClientError::decode_error("emostate packet", format!("non-finite value for {channel}")))
    }
}
