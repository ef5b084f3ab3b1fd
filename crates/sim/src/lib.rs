//! Scoreguard Simulation Core
//!
//! Deterministic building blocks for server-side score verification: the
//! seeded RNG, the canonical input log, the per-game configuration table and
//! the headless games the replay engine drives.
//!
//! # Architecture Constraints
//!
//! Nothing in this crate may:
//! - Perform I/O operations (file, network, etc.)
//! - Read wall-clock time
//! - Use ambient/unseeded randomness
//!
//! Given the same seed and input log, every simulation produces the same
//! score, events and state digest on every platform.

#![deny(unsafe_code)]

pub mod config;
pub mod digest;
pub mod engine;
pub mod games;
pub mod input;
pub mod rng;

pub use config::{GameConfig, GameConfigTable};
pub use digest::{STATE_DIGEST_ALGO_ID, StateHasher};
pub use engine::{
    Fidelity, GameEvent, GameEventKind, GameKind, RockSize, ScoreLedger, SimError, Simulation,
};
pub use input::{GameInput, InputData, InputKind, TimeMs};
pub use rng::{RNG_ALGO_ID, Rng};

/// Fixed replay timestep (60 Hz).
pub const TICK_MS: f64 = 1000.0 / 60.0;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use super::Rng;

    fn run_to_end(kind: GameKind, seed: i32, inputs: &[GameInput], max_ms: u64) -> (u64, u64) {
        let mut game = kind.new_simulation();
        game.init(Rng::new(seed));
        let mut ledger = ScoreLedger::new();
        let inputs = input::sorted_by_time(inputs);
        let mut next = 0;
        let mut tick: u64 = 0;
        loop {
            let now = tick as f64 * TICK_MS;
            if now > max_ms as f64 {
                break;
            }
            while next < inputs.len() && inputs[next].t as f64 <= now {
                game.process_input(&inputs[next]);
                next += 1;
            }
            ledger.set_time(now);
            game.update(TICK_MS, &mut ledger).unwrap();
            tick += 1;
            if game.check_game_over() {
                break;
            }
        }
        (ledger.score(), game.state_digest())
    }

    fn arb_inputs() -> impl Strategy<Value = Vec<GameInput>> {
        arb_inputs_within(60_000)
    }

    fn arb_inputs_within(span_ms: u64) -> impl Strategy<Value = Vec<GameInput>> {
        prop::collection::vec(
            (0..span_ms, any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
                |(t, is_action, a, b)| {
                    if is_action {
                        GameInput::action(t, a)
                    } else {
                        GameInput::direction(t, false, false, a, b)
                    }
                },
            ),
            0..200,
        )
    }

    #[test]
    fn test_every_kind_builds_a_simulation() {
        for kind in GameKind::ALL {
            let mut game = kind.new_simulation();
            game.init(Rng::new(1));
            let mut ledger = ScoreLedger::new();
            game.update(TICK_MS, &mut ledger).unwrap();
            assert!(!game.check_game_over());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_replay_is_deterministic(seed in any::<i32>(), inputs in arb_inputs()) {
            for kind in GameKind::ALL {
                let a = run_to_end(kind, seed, &inputs, 62_000);
                let b = run_to_end(kind, seed, &inputs, 62_000);
                prop_assert_eq!(a, b);
            }
        }

        #[test]
        fn prop_alien_assault_score_bounded(seed in any::<i32>(), inputs in arb_inputs()) {
            let max = GameConfigTable::builtin()
                .get(GameKind::AlienAssault.game_id())
                .map(|c| c.max_theoretical_score)
                .unwrap();
            let (score, _) = run_to_end(GameKind::AlienAssault, seed, &inputs, 62_000);
            prop_assert!(score <= max);
        }
    }

    /// Fire held from the first tick, random steering across the whole replay
    /// cap, and a final input at the cap itself.
    fn arb_full_cap_inputs() -> impl Strategy<Value = Vec<GameInput>> {
        (arb_inputs_within(config::DEFAULT_MAX_REPLAY_MS), any::<bool>()).prop_map(
            |(mut inputs, left)| {
                inputs.push(GameInput::action(0, true));
                inputs.push(GameInput::direction(
                    config::DEFAULT_MAX_REPLAY_MS,
                    false,
                    false,
                    left,
                    !left,
                ));
                inputs
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(6))]

        #[test]
        fn prop_alien_assault_bounded_over_full_cap(seed in any::<i32>(), inputs in arb_full_cap_inputs()) {
            let row = GameConfigTable::builtin()
                .get(GameKind::AlienAssault.game_id())
                .cloned()
                .unwrap();
            prop_assert_eq!(inputs.iter().map(|i| i.t).max(), Some(row.max_replay_ms));
            let (score, _) = run_to_end(GameKind::AlienAssault, seed, &inputs, row.max_replay_ms);
            prop_assert!(score <= row.max_theoretical_score);
        }
    }
}
