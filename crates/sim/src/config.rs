//! Per-game configuration table.
//!
//! One row per supported game, keyed by `gameId`. The same row bounds both the
//! statistical analyzer and the replay engine, so adding a game is a matter of
//! adding a row (and optionally a simulation) without touching engine code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default human-plausible floor for the median delta between action inputs.
pub const DEFAULT_MIN_REACTION_MS: f64 = 80.0;

/// Default hard wall on simulated time for a single replay (10 minutes).
pub const DEFAULT_MAX_REPLAY_MS: u64 = 600_000;

/// Bounds for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// No legitimate session can exceed this score.
    pub max_theoretical_score: u64,
    /// Shortest plausible session length that can carry a non-zero score.
    pub min_game_duration_ms: u64,
    /// Sustained input rate ceiling.
    pub max_inputs_per_second: f64,
    /// Sustained scoring rate ceiling.
    pub points_per_second_limit: f64,
    /// Median action-to-action delta below which timing is not human.
    #[serde(default = "default_min_reaction_ms")]
    pub min_reaction_ms: f64,
    /// Hard cap on simulated replay time.
    #[serde(default = "default_max_replay_ms")]
    pub max_replay_ms: u64,
}

fn default_min_reaction_ms() -> f64 {
    DEFAULT_MIN_REACTION_MS
}

fn default_max_replay_ms() -> u64 {
    DEFAULT_MAX_REPLAY_MS
}

/// Table of [`GameConfig`] rows keyed by game id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameConfigTable {
    games: BTreeMap<String, GameConfig>,
}

impl GameConfigTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows for the games shipped with the arcade.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert(
            "alien_assault",
            GameConfig {
                max_theoretical_score: 50_000,
                min_game_duration_ms: 5_000,
                max_inputs_per_second: 15.0,
                points_per_second_limit: 100.0,
                min_reaction_ms: DEFAULT_MIN_REACTION_MS,
                max_replay_ms: DEFAULT_MAX_REPLAY_MS,
            },
        );
        table.insert(
            "space_rocks",
            GameConfig {
                max_theoretical_score: 100_000,
                min_game_duration_ms: 10_000,
                max_inputs_per_second: 20.0,
                points_per_second_limit: 250.0,
                min_reaction_ms: DEFAULT_MIN_REACTION_MS,
                max_replay_ms: DEFAULT_MAX_REPLAY_MS,
            },
        );
        table.insert(
            "neon_runner",
            GameConfig {
                max_theoretical_score: 250_000,
                min_game_duration_ms: 3_000,
                max_inputs_per_second: 12.0,
                points_per_second_limit: 600.0,
                min_reaction_ms: 100.0,
                max_replay_ms: DEFAULT_MAX_REPLAY_MS,
            },
        );
        table
    }

    pub fn insert(&mut self, game_id: impl Into<String>, config: GameConfig) {
        self.games.insert(game_id.into(), config);
    }

    pub fn get(&self, game_id: &str) -> Option<&GameConfig> {
        self.games.get(game_id)
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.games.contains_key(game_id)
    }

    pub fn game_ids(&self) -> impl Iterator<Item = &str> {
        self.games.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl IntoIterator for GameConfigTable {
    type Item = (String, GameConfig);
    type IntoIter = std::collections::btree_map::IntoIter<String, GameConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.games.into_iter()
    }
}
