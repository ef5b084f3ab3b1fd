//! Simulation contract shared by every headless game.
//!
//! The replay engine owns the fixed-tick loop; a game only reacts to inputs,
//! advances by `delta_ms` and reports game over. Scoring goes exclusively
//! through [`ScoreLedger`] so every point awarded leaves an audit event.

use serde::Serialize;

use crate::games::{AlienAssault, SpaceRocks};
use crate::input::GameInput;
use crate::rng::Rng;

// ============================================================================
// Events & Ledger
// ============================================================================

/// What happened at an audited point in a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GameEventKind {
    AlienDestroyed { row: u8 },
    RockDestroyed { size: RockSize },
    WaveCleared { wave: u32 },
    LifeLost { lives_left: u32 },
    GameOver,
}

/// Rock size classes for the estimated Space Rocks replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RockSize {
    Large,
    Medium,
    Small,
}

/// One audited replay event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameEvent {
    /// Simulated time the event occurred, rounded to whole ms.
    pub at_ms: u64,
    #[serde(flatten)]
    pub kind: GameEventKind,
    /// Points awarded by this event (0 for non-scoring events).
    pub points: u64,
}

/// Score accumulator handed to [`Simulation::update`].
#[derive(Debug, Clone, Default)]
pub struct ScoreLedger {
    score: u64,
    now_ms: f64,
    events: Vec<GameEvent>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the simulated time stamped on subsequent events.
    pub fn set_time(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
    }

    /// Award points and log the event that earned them.
    pub fn add_score(&mut self, points: u64, kind: GameEventKind) {
        self.score = self.score.saturating_add(points);
        self.push(kind, points);
    }

    /// Log a non-scoring event.
    pub fn record(&mut self, kind: GameEventKind) {
        self.push(kind, 0);
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn into_parts(self) -> (u64, Vec<GameEvent>) {
        (self.score, self.events)
    }

    fn push(&mut self, kind: GameEventKind, points: u64) {
        self.events.push(GameEvent {
            at_ms: self.now_ms.round() as u64,
            kind,
            points,
        });
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Internal simulation failure. Signals an engine bug, never a cheat.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// `update` called before `init`.
    NotInitialized,
    /// Tick delta was not a positive finite number.
    InvalidDelta { delta_ms: f64 },
    /// A simulated quantity left its valid domain.
    StateCorrupted { reason: String },
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "Simulation updated before init"),
            Self::InvalidDelta { delta_ms } => {
                write!(f, "Invalid tick delta: {delta_ms} ms")
            }
            Self::StateCorrupted { reason } => {
                write!(f, "Simulation state corrupted: {reason}")
            }
        }
    }
}

impl std::error::Error for SimError {}

/// Reject non-positive or non-finite deltas.
pub fn check_delta(delta_ms: f64) -> Result<(), SimError> {
    if delta_ms.is_finite() && delta_ms > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidDelta { delta_ms })
    }
}

// ============================================================================
// Simulation Trait
// ============================================================================

/// Headless deterministic game.
///
/// Implementations MUST NOT read wall-clock time or ambient randomness; all
/// random decisions come from the [`Rng`] handed to `init`.
pub trait Simulation {
    /// Build initial state from the session RNG.
    fn init(&mut self, rng: Rng);

    /// Apply one input's effect (held flags, fire requests).
    fn process_input(&mut self, input: &GameInput);

    /// Advance simulated logic by `delta_ms`.
    fn update(&mut self, delta_ms: f64, ledger: &mut ScoreLedger) -> Result<(), SimError>;

    /// Terminal condition.
    fn check_game_over(&self) -> bool;

    /// Digest of the current state, for audit.
    fn state_digest(&self) -> u64;
}

// ============================================================================
// Game Registry
// ============================================================================

/// How faithfully a replay reproduces the client game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    /// Full physics; the replay score is authoritative.
    Exact,
    /// Seeded estimate of plausible outcomes; usable only as a ratio bound.
    Estimated,
}

/// Games with a registered headless simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameKind {
    AlienAssault,
    SpaceRocks,
}

impl GameKind {
    pub const ALL: [GameKind; 2] = [GameKind::AlienAssault, GameKind::SpaceRocks];

    /// Resolve a `gameId`; `None` means the game has no replay implementation.
    pub fn from_game_id(game_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.game_id() == game_id)
    }

    pub fn game_id(self) -> &'static str {
        match self {
            Self::AlienAssault => "alien_assault",
            Self::SpaceRocks => "space_rocks",
        }
    }

    pub fn fidelity(self) -> Fidelity {
        match self {
            Self::AlienAssault => Fidelity::Exact,
            Self::SpaceRocks => Fidelity::Estimated,
        }
    }

    /// Fresh, uninitialized simulation for this game.
    pub fn new_simulation(self) -> Box<dyn Simulation> {
        match self {
            Self::AlienAssault => Box::new(AlienAssault::new()),
            Self::SpaceRocks => Box::new(SpaceRocks::new()),
        }
    }
}
