//! Channel identifiers for the closed set of tracked signals

use serde::{Deserialize, Serialize};
use std::fmt;

/// Facial expression channels reported by the headset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Blink,
    WinkLeft,
    WinkRight,
    LookLeft,
    LookRight,
    RaiseBrow,
    FurrowBrow,
    Smile,
    Clench,
    SmirkLeft,
    SmirkRight,
    Laugh,
}

impl Expression {
    pub const ALL: [Expression; 12] = [
        Expression::Blink,
        Expression::WinkLeft,
        Expression::WinkRight,
        Expression::LookLeft,
        Expression::LookRight,
        Expression::RaiseBrow,
        Expression::FurrowBrow,
        Expression::Smile,
        Expression::Clench,
        Expression::SmirkLeft,
        Expression::SmirkRight,
        Expression::Laugh,
    ];

    /// Wire name of this expression
    pub fn as_str(self) -> &'static str {
        match self {
            Expression::Blink => "blink",
            Expression::WinkLeft => "wink_left",
            Expression::WinkRight => "wink_right",
            Expression::LookLeft => "look_left",
            Expression::LookRight => "look_right",
            Expression::RaiseBrow => "raise_brow",
            Expression::FurrowBrow => "furrow_brow",
            Expression::Smile => "smile",
            Expression::Clench => "clench",
            Expression::SmirkLeft => "smirk_left",
            Expression::SmirkRight => "smirk_right",
            Expression::Laugh => "laugh",
        }
    }
}

/// Affective (performance metric) channels reported by the headset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Interest,
    Engagement,
    Stress,
    Relaxation,
    Excitement,
    Focus,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Emotion::Interest,
        Emotion::Engagement,
        Emotion::Stress,
        Emotion::Relaxation,
        Emotion::Excitement,
        Emotion::Focus,
    ];

    /// Wire name of this emotion
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Interest => "interest",
            Emotion::Engagement => "engagement",
            Emotion::Stress => "stress",
            Emotion::Relaxation => "relaxation",
            Emotion::Excitement => "excitement",
            Emotion::Focus => "focus",
        }
    }
}

/// Identifier of one buffered channel
///
/// The channel set is fixed: every expression and every emotion always has
/// exactly one buffer, whether or not the server reports a value for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelId {
    Expression(Expression),
    Emotion(Emotion),
}

impl ChannelId {
    /// Number of known channels
    pub const COUNT: usize = Expression::ALL.len() + Emotion::ALL.len();

    /// All channels in stable order: expressions first, then emotions
    pub const ALL: [ChannelId; ChannelId::COUNT] = {
        let mut all = [ChannelId::Expression(Expression::Blink); ChannelId::COUNT];
        let mut i = 0;
        while i < Expression::ALL.len() {
            all[i] = ChannelId::Expression(Expression::ALL[i]);
            i += 1;
        }
        let mut j = 0;
        while j < Emotion::ALL.len() {
            all[i + j] = ChannelId::Emotion(Emotion::ALL[j]);
            j += 1;
        }
        all
    };

    /// Position of this channel within [`ChannelId::ALL`]
    pub fn index(self) -> usize {
        match self {
            ChannelId::Expression(e) => e as usize,
            ChannelId::Emotion(e) => Expression::ALL.len() + e as usize,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelId::Expression(e) => e.as_str(),
            ChannelId::Emotion(e) => e.as_str(),
        }
    }
}

impl From<Expression> for ChannelId {
    fn from(expression: Expression) -> Self {
        ChannelId::Expression(expression)
    }
}

impl From<Emotion> for ChannelId {
    fn from(emotion: Emotion) -> Self {
        ChannelId::Emotion(emotion)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::Expression(e) => write!(f, "expression/{}", e.as_str()),
            ChannelId::Emotion(e) => write!(f, "emotion/{}", e.as_str()),
        }
    }
}
