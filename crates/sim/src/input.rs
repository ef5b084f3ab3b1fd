//! Canonical timestamped input log.
//!
//! Ordering by `t` is NOT guaranteed on ingestion and several inputs may share
//! a timestamp. Consumers sort with [`sorted_by_time`] before use.

use serde::{Deserialize, Serialize};

/// Milliseconds since session start.
pub type TimeMs = u64;

/// Input category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Direction,
    Action,
}

impl InputKind {
    /// Stable byte code used by canonical encodings.
    pub fn code(self) -> u8 {
        match self {
            Self::Direction => 0,
            Self::Action => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direction => "direction",
            Self::Action => "action",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "direction" => Some(Self::Direction),
            "action" => Some(Self::Action),
            _ => None,
        }
    }
}

/// Button state carried by an input. Absent flags mean "not pressed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<bool>,
}

/// Bit assignments for [`InputData::flag_mask`].
pub const FLAG_UP: u8 = 1;
pub const FLAG_DOWN: u8 = 1 << 1;
pub const FLAG_LEFT: u8 = 1 << 2;
pub const FLAG_RIGHT: u8 = 1 << 3;
pub const FLAG_ACTION: u8 = 1 << 4;

impl InputData {
    pub fn up(&self) -> bool {
        self.up.unwrap_or(false)
    }

    pub fn down(&self) -> bool {
        self.down.unwrap_or(false)
    }

    pub fn left(&self) -> bool {
        self.left.unwrap_or(false)
    }

    pub fn right(&self) -> bool {
        self.right.unwrap_or(false)
    }

    pub fn action(&self) -> bool {
        self.action.unwrap_or(false)
    }

    /// Pressed flags packed into one byte. `None` and `Some(false)` encode
    /// identically.
    pub fn flag_mask(&self) -> u8 {
        let mut mask = 0;
        if self.up() {
            mask |= FLAG_UP;
        }
        if self.down() {
            mask |= FLAG_DOWN;
        }
        if self.left() {
            mask |= FLAG_LEFT;
        }
        if self.right() {
            mask |= FLAG_RIGHT;
        }
        if self.action() {
            mask |= FLAG_ACTION;
        }
        mask
    }
}

/// A single player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInput {
    pub t: TimeMs,
    #[serde(rename = "type")]
    pub kind: InputKind,
    #[serde(default)]
    pub data: InputData,
}

impl GameInput {
    /// Direction input with the given held flags.
    pub fn direction(t: TimeMs, up: bool, down: bool, left: bool, right: bool) -> Self {
        Self {
            t,
            kind: InputKind::Direction,
            data: InputData {
                up: Some(up),
                down: Some(down),
                left: Some(left),
                right: Some(right),
                action: None,
            },
        }
    }

    /// Action (fire) input; `pressed == false` is a release.
    pub fn action(t: TimeMs, pressed: bool) -> Self {
        Self {
            t,
            kind: InputKind::Action,
            data: InputData {
                action: Some(pressed),
                ..InputData::default()
            },
        }
    }

    /// Key used for canonical ordering: time first, then kind, then flags.
    pub fn canonical_key(&self) -> (TimeMs, u8, u8) {
        (self.t, self.kind.code(), self.data.flag_mask())
    }
}

/// Return a copy of `inputs` sorted ascending by `t`.
///
/// The sort is stable, so inputs sharing a timestamp keep their submitted
/// relative order.
pub fn sorted_by_time(inputs: &[GameInput]) -> Vec<GameInput> {
    let mut sorted = inputs.to_vec();
    sorted.sort_by_key(|input| input.t);
    sorted
}

/// Ascending timestamps of all action inputs.
pub fn action_times(inputs: &[GameInput]) -> Vec<TimeMs> {
    let mut times: Vec<TimeMs> = inputs
        .iter()
        .filter(|input| input.kind == InputKind::Action)
        .map(|input| input.t)
        .collect();
    times.sort_unstable();
    times
}
