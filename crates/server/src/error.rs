//! Error taxonomy for the submission and admin surfaces.
//!
//! Every error maps onto one machine-readable [`ErrorKind`] that the RPC layer
//! forwards to callers unchanged.

use serde::Serialize;
use thiserror::Error;

use crate::escalation::FlagType;

/// Machine-readable rejection kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Unauthenticated,
    PermissionDenied,
    InvalidArgument,
    NotFound,
    AlreadyExists,
    DeadlineExceeded,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission-denied",
            Self::InvalidArgument => "invalid-argument",
            Self::NotFound => "not-found",
            Self::AlreadyExists => "already-exists",
            Self::DeadlineExceeded => "deadline-exceeded",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backing-store failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("session {0} belongs to another player")]
    SessionNotOwned(String),
    #[error("session {0} already completed")]
    SessionCompleted(String),
    #[error("session {0} expired")]
    SessionExpired(String),
    #[error("session {0} already exists")]
    DuplicateSession(String),
    #[error("player {0} not found")]
    PlayerNotFound(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionNotFound(_) | Self::PlayerNotFound(_) => ErrorKind::NotFound,
            Self::SessionNotOwned(_) => ErrorKind::PermissionDenied,
            Self::SessionCompleted(_) | Self::DuplicateSession(_) => ErrorKind::AlreadyExists,
            Self::SessionExpired(_) => ErrorKind::DeadlineExceeded,
        }
    }
}

/// Rejected score submission.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmitError {
    #[error("caller is not authenticated")]
    Unauthenticated,
    #[error("account {0} is banned")]
    Banned(String),
    #[error("unknown game {0:?}")]
    UnknownGame(String),
    #[error("too many inputs: {got} (max {max})")]
    TooManyInputs { got: usize, max: usize },
    #[error("submission {field} does not match the session")]
    SessionMismatch { field: &'static str },
    #[error(transparent)]
    Session(#[from] StoreError),
    #[error("input log checksum mismatch")]
    ChecksumMismatch,
    #[error("gameplay anomaly detected: {flag} (confidence {confidence:.2})")]
    AnomalyDetected { flag: FlagType, confidence: f64 },
    #[error("score mismatch: claimed {claimed}, replay computed {calculated}")]
    ScoreMismatch { claimed: u64, calculated: u64 },
    #[error("malformed request: {0}")]
    Malformed(String),
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Banned(_) => ErrorKind::PermissionDenied,
            Self::UnknownGame(_)
            | Self::TooManyInputs { .. }
            | Self::SessionMismatch { .. }
            | Self::ChecksumMismatch
            | Self::AnomalyDetected { .. }
            | Self::ScoreMismatch { .. }
            | Self::Malformed(_) => ErrorKind::InvalidArgument,
            Self::Session(err) => err.kind(),
        }
    }
}

/// Rejected admin call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdminError {
    #[error("caller is not authenticated")]
    Unauthenticated,
    #[error("caller {0} is not an admin")]
    NotAdmin(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdminError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::NotAdmin(_) => ErrorKind::PermissionDenied,
            Self::Store(err) => err.kind(),
        }
    }
}

/// Service configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_kinds() {
        assert_eq!(
            StoreError::SessionCompleted("s".into()).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            StoreError::SessionExpired("s".into()).kind(),
            ErrorKind::DeadlineExceeded
        );
        assert_eq!(
            StoreError::SessionNotOwned("s".into()).kind(),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_submit_error_forwards_store_kind() {
        let err = SubmitError::from(StoreError::SessionNotFound("s".into()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "session s not found");
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(ErrorKind::PermissionDenied.to_string(), "permission-denied");
        assert_eq!(
            serde_json::to_value(ErrorKind::DeadlineExceeded).unwrap(),
            "deadline-exceeded"
        );
    }
}
