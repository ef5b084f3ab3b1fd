//! Scoreguard Replay System
//!
//! Server-side re-execution of submitted input logs.
//!
//! # Architecture
//!
//! - [`checksum`]: SHA-256 seal over the canonical input log
//! - [`replay`]: fixed-tick loop driving a headless simulation to a
//!   server-observed score
//!
//! Neither module trusts the client's ordering, timestamps or claimed score.

#![deny(unsafe_code)]

pub mod checksum;
pub mod replay;

pub use checksum::{generate_checksum, verify_checksum};
pub use replay::{EndReason, ReplayError, ReplayOptions, ReplayResult, replay, replay_simulation};
