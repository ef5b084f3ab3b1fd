//! Top-N leaderboards.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoardKey {
    /// Best verified score per player for one game.
    Game(String),
    /// Aggregate total score per player across games.
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub player: String,
    pub score: u64,
    /// Unix ms the score was reached; earlier wins ties.
    pub achieved_at: u64,
}

pub trait Leaderboard: Send + Sync {
    /// Offer a score; keeps the player's higher entry. Returns the player's
    /// 1-based rank if they are on the board afterwards.
    fn submit(&self, board: &BoardKey, player: &str, score: u64, at_ms: u64) -> Option<u32>;

    fn top(&self, board: &BoardKey, limit: usize) -> Vec<LeaderboardEntry>;
}

/// In-process leaderboard. Each update is one read-filter-sort-truncate pass
/// under a single lock.
#[derive(Debug)]
pub struct InMemoryLeaderboard {
    capacity: usize,
    boards: Mutex<HashMap<BoardKey, Vec<LeaderboardEntry>>>,
}

impl InMemoryLeaderboard {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            boards: Mutex::new(HashMap::new()),
        }
    }
}

impl Leaderboard for InMemoryLeaderboard {
    fn submit(&self, board: &BoardKey, player: &str, score: u64, at_ms: u64) -> Option<u32> {
        let mut boards = self.boards.lock();
        let entries = boards.entry(board.clone()).or_default();

        let improved = match entries.iter().find(|e| e.player == player) {
            Some(existing) => score > existing.score,
            None => true,
        };
        if improved {
            entries.retain(|e| e.player != player);
            entries.push(LeaderboardEntry {
                player: player.to_string(),
                score,
                achieved_at: at_ms,
            });
            entries.sort_by(|a, b| {
                b.score
                    .cmp(&a.score)
                    .then(a.achieved_at.cmp(&b.achieved_at))
                    .then_with(|| a.player.cmp(&b.player))
            });
            entries.truncate(self.capacity);
        }

        entries
            .iter()
            .position(|e| e.player == player)
            .map(|index| index as u32 + 1)
    }

    fn top(&self, board: &BoardKey, limit: usize) -> Vec<LeaderboardEntry> {
        self.boards
            .lock()
            .get(board)
            .map(|entries| entries.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}
