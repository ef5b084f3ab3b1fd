//! Scoreguard Server
//!
//! Server-side verification of arcade score submissions. The service owns:
//! - Submission sequencing ([`ScoreService::submit_score`])
//! - Statistical analysis ([`analysis`])
//! - Flag history and automatic bans ([`escalation`])
//! - Sessions, leaderboards and player stats behind store traits
//! - The admin surface ([`admin`]) and the protobuf RPC adapter ([`rpc`])
//!
//! # Evidence Before Rejection
//!
//! Caller errors (bad auth, unknown game, missing or foreign session) are
//! rejected without a flag. Integrity violations (checksum, analyzer, replay
//! mismatch) always record a [`FlagReason`] before the rejection is returned.
//! Replay engine failures never reject on their own.

#![deny(unsafe_code)]

pub mod admin;
pub mod analysis;
pub mod clock;
pub mod config;
pub mod error;
pub mod escalation;
pub mod leaderboard;
pub mod rpc;
pub mod session;

use std::collections::BTreeMap;
use std::sync::Arc;

use scoreguard_replay::{ReplayOptions, replay, verify_checksum};
use scoreguard_sim::{Fidelity, GameInput, GameKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

use analysis::{Analysis, analyze_gameplay};
use clock::Clock;
use config::ServiceConfig;
use error::SubmitError;
use escalation::{
    FlagOutcome, FlagReason, FlagType, InMemoryPlayerStore, PlayerAccount, PlayerStore, Severity,
    flag_account, is_account_banned,
};
use leaderboard::{BoardKey, InMemoryLeaderboard, Leaderboard};
use session::{GameMode, GameSession, InMemorySessionStore, SessionStore};

// ============================================================================
// Submission Records
// ============================================================================

/// The payload under evaluation. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSubmission {
    pub session_id: String,
    pub game_id: String,
    pub seed: i32,
    pub inputs: Vec<GameInput>,
    /// Client-claimed score.
    pub final_score: u64,
    /// Client-reported session length in ms.
    pub duration: u64,
    pub checksum: String,
}

/// Submission call body: `{ "gameData": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub game_data: GameSubmission,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub success: bool,
    /// True only when an exact replay confirmed the score.
    pub verified: bool,
    /// Authoritative score.
    pub score: u64,
    pub new_best: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Non-fatal flags raised by this submission.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

/// Lowercase, trimmed caller identity; `None` when absent or blank.
pub fn normalize_caller(caller: Option<&str>) -> Option<String> {
    caller
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_ascii_lowercase)
}

// ============================================================================
// Service
// ============================================================================

/// Score submission orchestrator.
pub struct ScoreService {
    config: ServiceConfig,
    sessions: Arc<dyn SessionStore>,
    players: Arc<dyn PlayerStore>,
    leaderboard: Arc<dyn Leaderboard>,
    clock: Arc<dyn Clock>,
}

impl ScoreService {
    pub fn new(
        config: ServiceConfig,
        sessions: Arc<dyn SessionStore>,
        players: Arc<dyn PlayerStore>,
        leaderboard: Arc<dyn Leaderboard>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            sessions,
            players,
            leaderboard,
            clock,
        }
    }

    /// Service backed entirely by in-process stores.
    pub fn in_memory(config: ServiceConfig, clock: Arc<dyn Clock>) -> Self {
        let leaderboard = Arc::new(InMemoryLeaderboard::new(config.leaderboard_size));
        Self::new(
            config,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryPlayerStore::new()),
            leaderboard,
            clock,
        )
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub fn players(&self) -> &dyn PlayerStore {
        self.players.as_ref()
    }

    pub fn leaderboard(&self) -> &dyn Leaderboard {
        self.leaderboard.as_ref()
    }

    /// Verify one submission.
    ///
    /// # Sequence
    ///
    /// 1. Authenticate caller
    /// 2. Banned accounts rejected before any analysis
    /// 3. Known game, bounded input count
    /// 4. Session exists, is owned, active and matches the submission
    /// 5. Checksum (high flag + reject on failure)
    /// 6. Statistical analysis (reject, medium flag, or log only)
    /// 7. Replay (exact: tolerance check, server score authoritative;
    ///    estimated: ratio bound, medium flag only)
    /// 8. Atomic session completion
    /// 9. Free mode returns without ranking
    /// 10. Best score, leaderboards, aggregate stats
    pub fn submit_score(
        &self,
        caller: Option<&str>,
        submission: &GameSubmission,
    ) -> Result<SubmitOutcome, SubmitError> {
        let player = normalize_caller(caller).ok_or(SubmitError::Unauthenticated)?;

        if is_account_banned(self.players.as_ref(), &player) {
            tracing::warn!(player, "Submission from banned account");
            return Err(SubmitError::Banned(player));
        }

        let game = self
            .config
            .games
            .get(&submission.game_id)
            .ok_or_else(|| SubmitError::UnknownGame(submission.game_id.clone()))?;
        if submission.inputs.len() > self.config.max_inputs {
            return Err(SubmitError::TooManyInputs {
                got: submission.inputs.len(),
                max: self.config.max_inputs,
            });
        }

        let now = self.clock.now_ms();
        let session = self.load_session(&player, submission, now)?;
        let claimed = submission.final_score;
        let mut raised = Vec::new();

        // Checksum
        if !verify_checksum(&submission.inputs, submission.seed, &submission.checksum) {
            self.flag(
                &player,
                submission,
                FlagType::ScoreMismatch,
                Severity::High,
                None,
                details([("reason", json!("checksum_mismatch"))]),
            );
            return Err(SubmitError::ChecksumMismatch);
        }

        // Statistical analysis
        let analysis = analyze_gameplay(
            game,
            &self.config.analysis,
            &submission.inputs,
            claimed,
            submission.duration,
        );
        if !analysis.valid || analysis.confidence > self.config.reject_confidence {
            let flag_type = analysis
                .primary_high()
                .map_or(FlagType::MultipleViolations, |f| f.flag);
            self.flag(
                &player,
                submission,
                flag_type,
                Severity::High,
                None,
                analysis_details(&analysis),
            );
            return Err(SubmitError::AnomalyDetected {
                flag: flag_type,
                confidence: analysis.confidence,
            });
        }
        if analysis.confidence > self.config.flag_confidence {
            let flag_type = analysis
                .strongest()
                .map_or(FlagType::MultipleViolations, |f| f.flag);
            self.flag(
                &player,
                submission,
                flag_type,
                Severity::Medium,
                None,
                analysis_details(&analysis),
            );
            raised.push(flag_type);
        } else if !analysis.findings.is_empty() {
            tracing::info!(
                player,
                session_id = submission.session_id,
                confidence = analysis.confidence,
                flags = ?analysis.flags(),
                "Sub-threshold findings"
            );
        }

        // Replay
        let mut score = claimed;
        let mut verified = false;
        if let Some(kind) = GameKind::from_game_id(&submission.game_id) {
            let result = replay(
                kind,
                submission.seed,
                &submission.inputs,
                &ReplayOptions::for_game(game),
            );
            if !result.valid {
                tracing::warn!(
                    player,
                    session_id = submission.session_id,
                    error = result.error_message.as_deref().unwrap_or("unknown"),
                    "Replay failed; relying on statistical analysis"
                );
            } else {
                match result.fidelity {
                    Fidelity::Exact => {
                        let tolerance = self.config.score_tolerance(claimed);
                        if result.score.abs_diff(claimed) as f64 > tolerance {
                            self.flag(
                                &player,
                                submission,
                                FlagType::ScoreMismatch,
                                Severity::High,
                                Some(result.score),
                                details([
                                    ("tolerance", json!(tolerance)),
                                    ("replayTicks", json!(result.ticks)),
                                    ("stateDigest", json!(format!("{:#018x}", result.state_digest))),
                                ]),
                            );
                            return Err(SubmitError::ScoreMismatch {
                                claimed,
                                calculated: result.score,
                            });
                        }
                        score = result.score;
                        verified = true;
                    }
                    Fidelity::Estimated => {
                        let bound =
                            result.score.max(1) as f64 * self.config.estimated_ratio_bound;
                        if claimed as f64 > bound {
                            self.flag(
                                &player,
                                submission,
                                FlagType::ScoreMismatch,
                                Severity::Medium,
                                Some(result.score),
                                details([
                                    ("estimate", json!(result.score)),
                                    ("ratioBound", json!(self.config.estimated_ratio_bound)),
                                ]),
                            );
                            raised.push(FlagType::ScoreMismatch);
                        }
                    }
                }
            }
        }

        let session = self
            .sessions
            .complete(&session.session_id, &player, score, verified, now)?;

        let flags = raised.iter().map(|f| f.as_str().to_string()).collect();
        if session.mode == GameMode::Free {
            tracing::info!(
                player,
                session_id = session.session_id,
                score,
                verified,
                "Free play scored"
            );
            return Ok(SubmitOutcome {
                success: true,
                verified,
                score,
                new_best: false,
                rank: None,
                flags,
            });
        }

        let (new_best, rank) = self.record_ranked(&player, &session, score, now);
        tracing::info!(
            player,
            session_id = session.session_id,
            game_id = session.game_id,
            score,
            verified,
            new_best,
            rank,
            "Score accepted"
        );
        Ok(SubmitOutcome {
            success: true,
            verified,
            score,
            new_best,
            rank,
            flags,
        })
    }

    fn load_session(
        &self,
        player: &str,
        submission: &GameSubmission,
        now: u64,
    ) -> Result<GameSession, SubmitError> {
        let session = self.sessions.get(&submission.session_id).ok_or_else(|| {
            error::StoreError::SessionNotFound(submission.session_id.clone())
        })?;
        session.check_completable(player, now)?;
        if session.game_id != submission.game_id {
            return Err(SubmitError::SessionMismatch { field: "gameId" });
        }
        if session.seed != submission.seed {
            return Err(SubmitError::SessionMismatch { field: "seed" });
        }
        Ok(session)
    }

    /// Update best score, stats and both leaderboards.
    ///
    /// Returns `(new_best, game_rank)`. Without an account record the stats are
    /// skipped but the per-game board is still offered the score.
    fn record_ranked(
        &self,
        player: &str,
        session: &GameSession,
        score: u64,
        now: u64,
    ) -> (bool, Option<u32>) {
        let mut new_best = false;
        let updated = self.players.modify(player, &mut |account: &mut PlayerAccount| {
            let previous = account.best_scores.get(&session.game_id).copied();
            new_best = previous.is_none_or(|best| score > best);
            if new_best {
                account.best_scores.insert(session.game_id.clone(), score);
            }
            account.stats.games_played += 1;
            account.stats.total_score = account.stats.total_score.saturating_add(score);
        });

        let rank = self.leaderboard.submit(
            &BoardKey::Game(session.game_id.clone()),
            player,
            score,
            now,
        );
        match updated {
            Some(account) => {
                self.leaderboard
                    .submit(&BoardKey::Global, player, account.stats.total_score, now);
            }
            None => {
                tracing::warn!(player, "Ranked score for unknown account; stats skipped");
                new_best = false;
            }
        }
        (new_best, rank)
    }

    fn flag(
        &self,
        player: &str,
        submission: &GameSubmission,
        flag_type: FlagType,
        severity: Severity,
        calculated_score: Option<u64>,
        details: BTreeMap<String, serde_json::Value>,
    ) -> FlagOutcome {
        let reason = FlagReason {
            flag_type,
            severity,
            game_id: submission.game_id.clone(),
            session_id: submission.session_id.clone(),
            claimed_score: submission.final_score,
            calculated_score,
            details,
            timestamp: self.clock.now_ms(),
        };
        flag_account(
            self.players.as_ref(),
            &self.config.escalation,
            player,
            reason,
        )
    }
}

fn details<const N: usize>(
    entries: [(&str, serde_json::Value); N],
) -> BTreeMap<String, serde_json::Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn analysis_details(analysis: &Analysis) -> BTreeMap<String, serde_json::Value> {
    details([
        ("confidence", json!(analysis.confidence)),
        (
            "findings",
            serde_json::to_value(&analysis.findings).unwrap_or_default(),
        ),
    ])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use scoreguard_replay::generate_checksum;
    use scoreguard_sim::{GameConfigTable, Rng};

    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ErrorKind;

    const PLAYER: &str = "0xplayer";
    const NOW: u64 = 1_700_000_000_000;

    struct Harness {
        service: ScoreService,
        clock: Arc<FixedClock>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(ServiceConfig::default())
        }

        fn with_config(config: ServiceConfig) -> Self {
            let clock = Arc::new(FixedClock::new(NOW));
            let service = ScoreService::in_memory(config, clock.clone());
            service.players().insert(PlayerAccount::new(PLAYER));
            Self { service, clock }
        }

        fn open_session(&self, id: &str, game_id: &str, mode: GameMode, seed: i32) {
            self.service
                .sessions()
                .insert(GameSession {
                    session_id: id.to_string(),
                    player: PLAYER.to_string(),
                    game_id: game_id.to_string(),
                    mode,
                    seed,
                    started_at: NOW - 60_000,
                    expires_at: NOW + 3_600_000,
                    completed_at: None,
                    final_score: None,
                    verified: false,
                })
                .unwrap();
        }

        fn account(&self) -> PlayerAccount {
            self.service.players().get(PLAYER).unwrap()
        }

        fn submit(&self, submission: &GameSubmission) -> Result<SubmitOutcome, SubmitError> {
            self.service.submit_score(Some(PLAYER), submission)
        }
    }

    /// ~50 inputs 200-500ms apart, alternating movement and fire press/release.
    fn human_inputs(seed: i32, count: usize) -> Vec<GameInput> {
        let mut rng = Rng::new(seed);
        let mut t = 0u64;
        let mut inputs = Vec::with_capacity(count);
        for i in 0..count {
            t += rng.next_int(200, 500) as u64;
            if i % 2 == 0 {
                let left = rng.chance();
                inputs.push(GameInput::direction(t, false, false, left, !left));
            } else {
                inputs.push(GameInput::action(t, i % 4 == 1));
            }
        }
        inputs
    }

    fn submission(
        session_id: &str,
        game_id: &str,
        seed: i32,
        inputs: Vec<GameInput>,
        final_score: u64,
    ) -> GameSubmission {
        let duration = inputs.last().map_or(0, |i| i.t) + 2_000;
        GameSubmission {
            session_id: session_id.to_string(),
            game_id: game_id.to_string(),
            seed,
            checksum: generate_checksum(&inputs, seed),
            inputs,
            final_score,
            duration,
        }
    }

    fn exact_replay_score(seed: i32, inputs: &[GameInput]) -> u64 {
        let table = GameConfigTable::builtin();
        let config = table.get("alien_assault").unwrap();
        replay(GameKind::AlienAssault, seed, inputs, &ReplayOptions::for_game(config)).score
    }

    #[test]
    fn test_legitimate_play_verified() {
        let h = Harness::new();
        h.open_session("s1", "alien_assault", GameMode::Ranked, 12345);
        let inputs = human_inputs(12345, 50);
        let expected = exact_replay_score(12345, &inputs);

        let outcome = h
            .submit(&submission("s1", "alien_assault", 12345, inputs, expected))
            .unwrap();
        assert!(outcome.success);
        assert!(outcome.verified);
        assert_eq!(outcome.score, expected);
        assert!(outcome.new_best);
        assert_eq!(outcome.rank, Some(1));
        assert!(outcome.flags.is_empty());

        let account = h.account();
        assert_eq!(account.flags.count, 0);
        assert_eq!(account.best_scores.get("alien_assault"), Some(&expected));
        assert_eq!(account.stats.games_played, 1);

        let session = h.service.sessions().get("s1").unwrap();
        assert_eq!(session.final_score, Some(expected));
        assert!(session.verified);
    }

    #[test]
    fn test_impossible_score_rejected_with_flag() {
        let h = Harness::new();
        h.open_session("s1", "alien_assault", GameMode::Ranked, 12345);
        let err = h
            .submit(&submission("s1", "alien_assault", 12345, human_inputs(12345, 50), 99_999_999))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let account = h.account();
        assert_eq!(account.flags.count, 1);
        let reason = &account.flags.reasons[0];
        assert_eq!(reason.flag_type, FlagType::ImpossibleScore);
        assert_eq!(reason.severity, Severity::High);
        assert_eq!(reason.claimed_score, 99_999_999);
        // Rejected sessions stay open
        assert!(!h.service.sessions().get("s1").unwrap().is_completed());
    }

    #[test]
    fn test_inhuman_bot_rejected() {
        let h = Harness::new();
        h.open_session("s1", "alien_assault", GameMode::Ranked, 7);
        let inputs: Vec<_> = (0..500)
            .map(|i| GameInput::action(i * 55, i % 2 == 0))
            .collect();

        let err = h
            .submit(&submission("s1", "alien_assault", 7, inputs, 120))
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::AnomalyDetected {
                flag: FlagType::BotFrequency,
                ..
            }
        ));
        let reason = &h.account().flags.reasons[0];
        assert_eq!(reason.flag_type, FlagType::BotFrequency);
        assert_eq!(reason.severity, Severity::High);
        assert!(reason.details.contains_key("findings"));
    }

    #[test]
    fn test_fixed_rhythm_bot_with_short_holds_rejected() {
        let h = Harness::new();
        h.open_session("n1", "neon_runner", GameMode::Ranked, 5);
        let inputs: Vec<_> = (0..500u64)
            .flat_map(|i| {
                [
                    GameInput::action(i * 100, true),
                    GameInput::action(i * 100 + 30, false),
                ]
            })
            .collect();
        let mut sub = submission("n1", "neon_runner", 5, inputs, 1_000);
        sub.duration = 50_000;

        let err = h.submit(&sub).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::AnomalyDetected {
                flag: FlagType::BotFrequency,
                ..
            }
        ));
        assert_eq!(h.account().flags.reasons[0].severity, Severity::High);
        assert!(!h.service.sessions().get("n1").unwrap().is_completed());
        assert!(
            h.service
                .leaderboard()
                .top(&BoardKey::Game("neon_runner".into()), 10)
                .is_empty()
        );
    }

    #[test]
    fn test_replay_mismatch_rejected_with_calculated_score() {
        let h = Harness::new();
        h.open_session("s1", "alien_assault", GameMode::Ranked, 12345);
        let inputs = human_inputs(12345, 50);
        let expected = exact_replay_score(12345, &inputs);
        let claimed = expected * 2 + 100;

        let err = h
            .submit(&submission("s1", "alien_assault", 12345, inputs, claimed))
            .unwrap_err();
        assert_eq!(
            err,
            SubmitError::ScoreMismatch {
                claimed,
                calculated: expected
            }
        );
        let reason = &h.account().flags.reasons[0];
        assert_eq!(reason.flag_type, FlagType::ScoreMismatch);
        assert_eq!(reason.calculated_score, Some(expected));
        assert_eq!(reason.claimed_score, claimed);
        assert!(h.service.leaderboard().top(&BoardKey::Global, 10).is_empty());
    }

    #[test]
    fn test_completed_session_resubmission() {
        let h = Harness::new();
        h.open_session("s1", "alien_assault", GameMode::Ranked, 12345);
        let inputs = human_inputs(12345, 50);
        let expected = exact_replay_score(12345, &inputs);
        let sub = submission("s1", "alien_assault", 12345, inputs, expected);

        h.submit(&sub).unwrap();
        let err = h.submit(&sub).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let board = h
            .service
            .leaderboard()
            .top(&BoardKey::Game("alien_assault".into()), 10);
        assert_eq!(board.len(), 1);
        assert_eq!(h.account().stats.games_played, 1);
        assert_eq!(h.account().flags.count, 0);
    }

    #[test]
    fn test_free_mode_never_ranks() {
        let h = Harness::new();
        h.open_session("free", "alien_assault", GameMode::Free, 12345);
        let inputs = human_inputs(12345, 50);
        let expected = exact_replay_score(12345, &inputs);

        let outcome = h
            .submit(&submission("free", "alien_assault", 12345, inputs, expected))
            .unwrap();
        assert!(outcome.success);
        assert!(!outcome.new_best);
        assert_eq!(outcome.rank, None);
        assert!(
            h.service
                .leaderboard()
                .top(&BoardKey::Game("alien_assault".into()), 10)
                .is_empty()
        );
        assert_eq!(h.account().stats.games_played, 0);
        assert!(h.service.sessions().get("free").unwrap().is_completed());
    }

    #[test]
    fn test_caller_errors_record_no_flags() {
        let h = Harness::new();
        h.open_session("s1", "alien_assault", GameMode::Ranked, 12345);
        let sub = submission("s1", "alien_assault", 12345, human_inputs(1, 20), 0);

        let err = h.service.submit_score(None, &sub).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        let err = h.service.submit_score(Some("   "), &sub).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);

        let mut unknown = sub.clone();
        unknown.game_id = "pong".to_string();
        assert_eq!(h.submit(&unknown).unwrap_err().kind(), ErrorKind::InvalidArgument);

        let mut missing = sub.clone();
        missing.session_id = "nope".to_string();
        assert_eq!(h.submit(&missing).unwrap_err().kind(), ErrorKind::NotFound);

        h.service.players().insert(PlayerAccount::new("0xother"));
        let err = h.service.submit_score(Some("0xOTHER"), &sub).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let mut wrong_seed = sub.clone();
        wrong_seed.seed = 1;
        assert_eq!(
            h.submit(&wrong_seed).unwrap_err(),
            SubmitError::SessionMismatch { field: "seed" }
        );

        h.clock.advance(3_600_001);
        assert_eq!(h.submit(&sub).unwrap_err().kind(), ErrorKind::DeadlineExceeded);

        assert_eq!(h.account().flags.count, 0);
    }

    #[test]
    fn test_banned_account_rejected_before_analysis() {
        let h = Harness::new();
        h.open_session("s1", "alien_assault", GameMode::Ranked, 12345);
        escalation::ban_account(h.service.players(), PLAYER, "manual", NOW).unwrap();

        let err = h
            .submit(&submission("s1", "alien_assault", 12345, Vec::new(), 99_999_999))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(h.account().flags.count, 0);
    }

    #[test]
    fn test_checksum_failure_flags_high() {
        let h = Harness::new();
        h.open_session("s1", "alien_assault", GameMode::Ranked, 12345);
        let mut sub = submission("s1", "alien_assault", 12345, human_inputs(12345, 50), 10);
        sub.inputs[3].t += 1;

        assert_eq!(h.submit(&sub).unwrap_err(), SubmitError::ChecksumMismatch);
        let reason = &h.account().flags.reasons[0];
        assert_eq!(reason.flag_type, FlagType::ScoreMismatch);
        assert_eq!(reason.severity, Severity::High);
        assert_eq!(reason.details["reason"], "checksum_mismatch");
    }

    #[test]
    fn test_medium_confidence_flags_but_allows() {
        let h = Harness::new();
        h.open_session("n1", "neon_runner", GameMode::Ranked, 3);
        // Median action delta 20ms with wildly uneven spacing.
        let mut inputs = Vec::new();
        let mut t = 0;
        for i in 0..12 {
            t += if i % 2 == 0 { 300 } else { 20 };
            inputs.push(GameInput::action(t, i % 2 == 0));
        }
        let mut sub = submission("n1", "neon_runner", 3, inputs, 500);
        sub.duration = 10_000;

        let outcome = h.submit(&sub).unwrap();
        assert!(outcome.success);
        // No replay implementation: unverified, claimed score stands.
        assert!(!outcome.verified);
        assert_eq!(outcome.score, 500);
        assert_eq!(outcome.flags, vec!["inhuman_reaction".to_string()]);

        let account = h.account();
        assert_eq!(account.flags.count, 1);
        assert_eq!(account.flags.reasons[0].severity, Severity::Medium);
    }

    #[test]
    fn test_estimated_replay_ratio_bound_is_soft() {
        let h = Harness::new();
        h.open_session("r1", "space_rocks", GameMode::Ranked, 9);
        let inputs = human_inputs(9, 50);
        let mut sub = submission("r1", "space_rocks", 9, inputs.clone(), 0);
        let table = GameConfigTable::builtin();
        let estimate = replay(
            GameKind::SpaceRocks,
            9,
            &inputs,
            &ReplayOptions::for_game(table.get("space_rocks").unwrap()),
        )
        .score;
        // Keep the claim under the analyzer's points/s ceiling.
        sub.final_score = estimate.max(1) * 20 + 10;
        sub.duration = 600_000;

        let outcome = h.submit(&sub).unwrap();
        assert!(outcome.success);
        assert!(!outcome.verified);
        assert_eq!(outcome.score, sub.final_score);
        assert_eq!(outcome.flags, vec!["score_mismatch".to_string()]);
        let reason = &h.account().flags.reasons[0];
        assert_eq!(reason.severity, Severity::Medium);
        assert_eq!(reason.calculated_score, Some(estimate));
    }

    #[test]
    fn test_global_board_aggregates_total() {
        let h = Harness::new();
        let mut total = 0;
        for (i, seed) in [11, 22].into_iter().enumerate() {
            let id = format!("g{i}");
            h.open_session(&id, "alien_assault", GameMode::Ranked, seed);
            let inputs = human_inputs(seed, 50);
            let expected = exact_replay_score(seed, &inputs);
            total += expected;
            h.submit(&submission(&id, "alien_assault", seed, inputs, expected))
                .unwrap();
        }
        let global = h.service.leaderboard().top(&BoardKey::Global, 10);
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].score, total);
        assert_eq!(h.account().stats.total_score, total);
    }

    #[test]
    fn test_repeated_high_flags_ban_account() {
        let config = ServiceConfig {
            escalation: escalation::EscalationPolicy {
                high_threshold: 2,
                ..Default::default()
            },
            ..ServiceConfig::default()
        };
        let h = Harness::with_config(config);
        for id in ["a", "b"] {
            h.open_session(id, "alien_assault", GameMode::Ranked, 12345);
            let err = h
                .submit(&submission(id, "alien_assault", 12345, human_inputs(1, 30), 99_999_999))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        assert!(h.account().is_banned);

        h.open_session("c", "alien_assault", GameMode::Ranked, 12345);
        let err = h
            .submit(&submission("c", "alien_assault", 12345, human_inputs(1, 30), 10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }
}
