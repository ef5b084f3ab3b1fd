//! Fixed-tick headless replay.
//!
//! Re-executes a submitted input log against a freshly seeded simulation and
//! reports the score the server itself observed. Internal failures, including
//! panics inside a simulation, are reported as `valid: false` and never
//! propagate to the caller.

use std::panic::{self, AssertUnwindSafe};

use scoreguard_sim::input::sorted_by_time;
use scoreguard_sim::{
    Fidelity, GameConfig, GameEvent, GameInput, GameKind, Rng, ScoreLedger, SimError, Simulation,
    TICK_MS,
};
use serde::Serialize;

/// Simulated time allowed after the last input for in-flight effects to land.
pub const DEFAULT_GRACE_MS: u64 = 2_000;

/// Upper bound on audited events per replay.
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

// ============================================================================
// Options & Results
// ============================================================================

/// Replay loop parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOptions {
    pub tick_ms: f64,
    pub grace_ms: u64,
    /// Hard wall on simulated time regardless of input timestamps.
    pub max_replay_ms: u64,
    pub max_events: usize,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            grace_ms: DEFAULT_GRACE_MS,
            max_replay_ms: scoreguard_sim::config::DEFAULT_MAX_REPLAY_MS,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl ReplayOptions {
    /// Options bounded by a game's configured replay cap.
    pub fn for_game(config: &GameConfig) -> Self {
        Self {
            max_replay_ms: config.max_replay_ms,
            ..Self::default()
        }
    }
}

/// Why the replay loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    GameOver,
    /// Ran past the last input plus grace.
    InputsExhausted,
    /// Hit `max_replay_ms` before the inputs ran out.
    TimeCap,
    EventBudget,
    /// Simulation error or panic.
    Failed,
}

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayResult {
    /// Whether the simulation completed without internal error.
    pub valid: bool,
    pub score: u64,
    /// Simulated time covered.
    pub duration_ms: u64,
    pub events: Vec<GameEvent>,
    pub fidelity: Fidelity,
    pub ticks: u64,
    pub end_reason: EndReason,
    pub state_digest: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ReplayResult {
    fn failed(fidelity: Fidelity, error: &ReplayError) -> Self {
        Self {
            valid: false,
            score: 0,
            duration_ms: 0,
            events: Vec::new(),
            fidelity,
            ticks: error.tick(),
            end_reason: EndReason::Failed,
            state_digest: 0,
            error_message: Some(error.to_string()),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Internal replay failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// The simulation rejected an update.
    Simulation { tick: u64, source: SimError },
    /// The simulation panicked.
    Panicked { message: String },
}

impl ReplayError {
    fn tick(&self) -> u64 {
        match self {
            Self::Simulation { tick, .. } => *tick,
            Self::Panicked { .. } => 0,
        }
    }
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulation { tick, source } => {
                write!(f, "Simulation failed at tick {tick}: {source}")
            }
            Self::Panicked { message } => write!(f, "Simulation panicked: {message}"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Simulation { source, .. } => Some(source),
            Self::Panicked { .. } => None,
        }
    }
}

// ============================================================================
// Replay Loop
// ============================================================================

/// Replay `inputs` for a registered game.
pub fn replay(
    kind: GameKind,
    seed: i32,
    inputs: &[GameInput],
    options: &ReplayOptions,
) -> ReplayResult {
    let mut game = kind.new_simulation();
    let result = replay_simulation(game.as_mut(), kind.fidelity(), seed, inputs, options);
    tracing::debug!(
        game = kind.game_id(),
        seed,
        valid = result.valid,
        score = result.score,
        ticks = result.ticks,
        end_reason = ?result.end_reason,
        "Replay finished"
    );
    result
}

/// Replay `inputs` against an arbitrary simulation.
///
/// # Loop
///
/// 1. Sort inputs by `t` (stable)
/// 2. `end_ms = min(last_t + grace_ms, max_replay_ms)`
/// 3. Per tick: apply inputs with `t <= now`, `update`, check game over and
///    the event budget
/// 4. Stop once `now > end_ms`
pub fn replay_simulation(
    game: &mut dyn Simulation,
    fidelity: Fidelity,
    seed: i32,
    inputs: &[GameInput],
    options: &ReplayOptions,
) -> ReplayResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        run_loop(game, fidelity, seed, inputs, options)
    }));

    let error = match outcome {
        Ok(Ok(result)) => return result,
        Ok(Err(error)) => error,
        Err(payload) => ReplayError::Panicked {
            message: panic_message(payload.as_ref()),
        },
    };
    tracing::warn!(%error, "Replay aborted");
    ReplayResult::failed(fidelity, &error)
}

fn run_loop(
    game: &mut dyn Simulation,
    fidelity: Fidelity,
    seed: i32,
    inputs: &[GameInput],
    options: &ReplayOptions,
) -> Result<ReplayResult, ReplayError> {
    let inputs = sorted_by_time(inputs);
    let last_t = inputs.last().map_or(0, |input| input.t);
    let input_end_ms = last_t.saturating_add(options.grace_ms);
    let end_ms = input_end_ms.min(options.max_replay_ms);

    game.init(Rng::new(seed));
    let mut ledger = ScoreLedger::new();
    let mut next_input = 0;
    let mut tick: u64 = 0;

    let end_reason = loop {
        let now = tick as f64 * options.tick_ms;
        if now > end_ms as f64 {
            break if input_end_ms > options.max_replay_ms {
                EndReason::TimeCap
            } else {
                EndReason::InputsExhausted
            };
        }

        while next_input < inputs.len() && inputs[next_input].t as f64 <= now {
            game.process_input(&inputs[next_input]);
            next_input += 1;
        }

        ledger.set_time(now);
        game.update(options.tick_ms, &mut ledger)
            .map_err(|source| ReplayError::Simulation { tick, source })?;
        tick += 1;

        if game.check_game_over() {
            break EndReason::GameOver;
        }
        if ledger.event_count() >= options.max_events {
            break EndReason::EventBudget;
        }
    };

    let state_digest = game.state_digest();
    let (score, events) = ledger.into_parts();
    Ok(ReplayResult {
        valid: true,
        score,
        duration_ms: (tick as f64 * options.tick_ms).round() as u64,
        events,
        fidelity,
        ticks: tick,
        end_reason,
        state_digest,
        error_message: None,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
