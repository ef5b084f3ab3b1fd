//! Scoreguard Wire Protocol Types
//!
//! Protobuf messages for the score submission RPC. The authenticated-RPC
//! front end decodes a [`SubmitScoreRequest`], and the server answers with
//! either a [`SubmitScoreResponse`] or an [`ErrorStatus`] carrying a
//! machine-readable kind.
//!
//! Field names mirror the JSON submission record (`sessionId`, `gameId`,
//! `seed`, `inputs`, `finalScore`, `duration`, `checksum`).

#![deny(unsafe_code)]

use prost::Message;
use scoreguard_sim::{GameInput, InputData, InputKind};

// ============================================================================
// Request Messages
// ============================================================================

/// One timestamped input.
#[derive(Clone, PartialEq, Message)]
pub struct GameInputProto {
    /// Milliseconds since session start.
    #[prost(uint64, tag = "1")]
    pub t: u64,

    /// `"direction"` or `"action"`.
    #[prost(string, tag = "2")]
    pub r#type: String,

    #[prost(bool, optional, tag = "3")]
    pub up: Option<bool>,
    #[prost(bool, optional, tag = "4")]
    pub down: Option<bool>,
    #[prost(bool, optional, tag = "5")]
    pub left: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub right: Option<bool>,
    #[prost(bool, optional, tag = "7")]
    pub action: Option<bool>,
}

/// The submission payload under evaluation.
#[derive(Clone, PartialEq, Message)]
pub struct GameDataProto {
    #[prost(string, tag = "1")]
    pub session_id: String,

    #[prost(string, tag = "2")]
    pub game_id: String,

    #[prost(int32, tag = "3")]
    pub seed: i32,

    #[prost(message, repeated, tag = "4")]
    pub inputs: Vec<GameInputProto>,

    /// Client-claimed score. Never trusted.
    #[prost(uint64, tag = "5")]
    pub final_score: u64,

    /// Client-reported session length in ms.
    #[prost(uint64, tag = "6")]
    pub duration: u64,

    /// Hex SHA-256 over the canonical input log.
    #[prost(string, tag = "7")]
    pub checksum: String,
}

/// Submission call envelope.
///
/// `caller` is the identity bound by the authentication layer, not a value
/// the client chooses. Empty means unauthenticated.
#[derive(Clone, PartialEq, Message)]
pub struct SubmitScoreRequest {
    #[prost(string, tag = "1")]
    pub caller: String,

    #[prost(message, optional, tag = "2")]
    pub game_data: Option<GameDataProto>,
}

// ============================================================================
// Response Messages
// ============================================================================

/// Successful submission outcome.
#[derive(Clone, PartialEq, Message)]
pub struct SubmitScoreResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,

    /// True only when an exact replay confirmed the score.
    #[prost(bool, tag = "2")]
    pub verified: bool,

    /// Authoritative score (server-computed when verified).
    #[prost(uint64, tag = "3")]
    pub score: u64,

    #[prost(bool, tag = "4")]
    pub new_best: bool,

    #[prost(uint32, optional, tag = "5")]
    pub rank: Option<u32>,

    /// Flag types raised but not fatal to this submission.
    #[prost(string, repeated, tag = "6")]
    pub flags: Vec<String>,
}

/// Rejection.
#[derive(Clone, PartialEq, Message)]
pub struct ErrorStatus {
    /// `unauthenticated | permission-denied | invalid-argument | not-found |
    /// already-exists | deadline-exceeded | internal`
    #[prost(string, tag = "1")]
    pub kind: String,

    #[prost(string, tag = "2")]
    pub message: String,
}

// ============================================================================
// Conversions
// ============================================================================

/// Malformed wire payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// `type` was neither `direction` nor `action`.
    UnknownInputType { index: usize, value: String },
    /// Request carried no `game_data`.
    MissingGameData,
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownInputType { index, value } => {
                write!(f, "Input {index} has unknown type {value:?}")
            }
            Self::MissingGameData => write!(f, "Request is missing gameData"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<GameInput> for GameInputProto {
    fn from(input: GameInput) -> Self {
        Self {
            t: input.t,
            r#type: input.kind.as_str().to_string(),
            up: input.data.up,
            down: input.data.down,
            left: input.data.left,
            right: input.data.right,
            action: input.data.action,
        }
    }
}

impl GameInputProto {
    /// Convert to the sim input model. `index` is only used for error context.
    pub fn to_input(&self, index: usize) -> Result<GameInput, WireError> {
        let kind = InputKind::parse(&self.r#type).ok_or_else(|| WireError::UnknownInputType {
            index,
            value: self.r#type.clone(),
        })?;
        Ok(GameInput {
            t: self.t,
            kind,
            data: InputData {
                up: self.up,
                down: self.down,
                left: self.left,
                right: self.right,
                action: self.action,
            },
        })
    }
}

impl GameDataProto {
    /// Convert every input, failing on the first malformed one.
    pub fn decode_inputs(&self) -> Result<Vec<GameInput>, WireError> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(index, input)| input.to_input(index))
            .collect()
    }
}

/// Decode a request envelope from bytes.
pub fn decode_request(bytes: &[u8]) -> Result<SubmitScoreRequest, prost::DecodeError> {
    SubmitScoreRequest::decode(bytes)
}

// ============================================================================
// Tests
// ============================================================================
