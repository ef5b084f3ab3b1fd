//! Statistical gameplay analyzer.
//!
//! Game-agnostic heuristics over the raw input log. Each check produces a
//! weighted [`Finding`]; confidence combines them as a noisy-OR so that
//! independent signals reinforce each other without a simple count.
//!
//! Speed alone is never a high-severity signal: fast play is legitimate. Only
//! fast *and* near-constant press cadence or hold duration is treated as a
//! bot. Presses and releases are measured separately so an asymmetric duty
//! cycle cannot hide a fixed rhythm.

use scoreguard_sim::input::{action_times, sorted_by_time};
use scoreguard_sim::{GameConfig, GameInput, InputKind};
use serde::{Deserialize, Serialize};

use crate::escalation::{FlagType, Severity};

// ============================================================================
// Settings
// ============================================================================

/// Game-independent analyzer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Coefficient of variation below which action timing is machine-like.
    pub bot_max_cv: f64,
    /// Mean action delta below which uniform timing is suspicious.
    pub bot_max_mean_ms: f64,
    /// Deltas needed before the uniformity check applies.
    pub min_timing_samples: usize,
    /// Fraction of the theoretical max that counts as perfect play.
    pub perfect_play_ratio: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            bot_max_cv: 0.08,
            bot_max_mean_ms: 150.0,
            min_timing_samples: 10,
            perfect_play_ratio: 0.95,
        }
    }
}

const WEIGHT_EMPTY_LOG: f64 = 1.0;
const WEIGHT_IMPOSSIBLE_SCORE: f64 = 0.9;
const WEIGHT_BOT_TIMING: f64 = 0.6;
const WEIGHT_INHUMAN_REACTION: f64 = 0.45;
const WEIGHT_INPUT_RATE: f64 = 0.25;
const WEIGHT_POINTS_RATE: f64 = 0.3;
const WEIGHT_SHORT_DURATION: f64 = 0.3;
const WEIGHT_PERFECT_PLAY: f64 = 0.15;

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub flag: FlagType,
    pub severity: Severity,
    /// Contribution to confidence, in `[0, 1]`.
    pub weight: f64,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// False when any high-severity finding is present.
    pub valid: bool,
    pub findings: Vec<Finding>,
    pub confidence: f64,
}

impl Analysis {
    fn from_findings(findings: Vec<Finding>) -> Self {
        let clean = findings
            .iter()
            .fold(1.0, |acc, f| acc * (1.0 - f.weight.clamp(0.0, 1.0)));
        Self {
            valid: !findings.iter().any(|f| f.severity == Severity::High),
            confidence: (1.0 - clean).clamp(0.0, 1.0),
            findings,
        }
    }

    /// Distinct flag types in first-seen order.
    pub fn flags(&self) -> Vec<FlagType> {
        let mut flags = Vec::new();
        for finding in &self.findings {
            if !flags.contains(&finding.flag) {
                flags.push(finding.flag);
            }
        }
        flags
    }

    /// Highest-weight high-severity finding.
    pub fn primary_high(&self) -> Option<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::High)
            .max_by(|a, b| a.weight.total_cmp(&b.weight))
    }

    /// Highest-weight finding of any severity.
    pub fn strongest(&self) -> Option<&Finding> {
        self.findings.iter().max_by(|a, b| a.weight.total_cmp(&b.weight))
    }
}

// ============================================================================
// Timing Statistics
// ============================================================================

/// Summary of a series of intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingStats {
    pub samples: usize,
    pub mean_ms: f64,
    pub median_ms: f64,
    /// Population standard deviation over the mean. Zero when the mean is zero.
    pub cv: f64,
}

impl TimingStats {
    fn from_intervals(mut intervals: Vec<f64>) -> Option<Self> {
        if intervals.is_empty() {
            return None;
        }

        let n = intervals.len() as f64;
        let mean = intervals.iter().sum::<f64>() / n;
        let variance = intervals.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        let cv = if mean > 0.0 { variance.sqrt() / mean } else { 0.0 };

        intervals.sort_by(f64::total_cmp);
        let mid = intervals.len() / 2;
        let median = if intervals.len() % 2 == 0 {
            (intervals[mid - 1] + intervals[mid]) / 2.0
        } else {
            intervals[mid]
        };

        Some(Self {
            samples: intervals.len(),
            mean_ms: mean,
            median_ms: median,
            cv,
        })
    }

    /// Enough samples, fast, and near-constant.
    fn is_machine_like(&self, settings: &AnalysisSettings) -> bool {
        self.samples >= settings.min_timing_samples
            && self.cv < settings.bot_max_cv
            && self.mean_ms < settings.bot_max_mean_ms
    }
}

/// Deltas between consecutive action inputs, presses and releases mixed.
/// `None` when fewer than two action inputs exist.
pub fn action_timing(inputs: &[GameInput]) -> Option<TimingStats> {
    let times = action_times(inputs);
    TimingStats::from_intervals(times.windows(2).map(|w| (w[1] - w[0]) as f64).collect())
}

/// Press-to-press cadence: deltas between consecutive `action: true` inputs.
pub fn press_timing(inputs: &[GameInput]) -> Option<TimingStats> {
    let mut presses: Vec<u64> = inputs
        .iter()
        .filter(|i| i.kind == InputKind::Action && i.data.action())
        .map(|i| i.t)
        .collect();
    presses.sort_unstable();
    TimingStats::from_intervals(presses.windows(2).map(|w| (w[1] - w[0]) as f64).collect())
}

/// Hold durations: each press to the next release.
pub fn hold_timing(inputs: &[GameInput]) -> Option<TimingStats> {
    let mut held_since = None;
    let mut holds = Vec::new();
    for input in sorted_by_time(inputs) {
        if input.kind != InputKind::Action {
            continue;
        }
        if input.data.action() {
            held_since = Some(input.t);
        } else if let Some(pressed_at) = held_since.take() {
            holds.push((input.t - pressed_at) as f64);
        }
    }
    TimingStats::from_intervals(holds)
}

// ============================================================================
// Analyzer
// ============================================================================

/// Score one submission against a game's bounds.
///
/// Never panics on malformed input: empty logs, zero durations, duplicated or
/// unordered timestamps all produce findings rather than errors.
pub fn analyze_gameplay(
    game: &GameConfig,
    settings: &AnalysisSettings,
    inputs: &[GameInput],
    claimed_score: u64,
    duration_ms: u64,
) -> Analysis {
    let mut findings = Vec::new();

    if inputs.is_empty() {
        findings.push(Finding {
            flag: FlagType::BotFrequency,
            severity: Severity::High,
            weight: WEIGHT_EMPTY_LOG,
            detail: "empty input log".to_string(),
        });
    }

    if claimed_score > game.max_theoretical_score {
        findings.push(Finding {
            flag: FlagType::ImpossibleScore,
            severity: Severity::High,
            weight: WEIGHT_IMPOSSIBLE_SCORE,
            detail: format!(
                "score {claimed_score} exceeds theoretical max {}",
                game.max_theoretical_score
            ),
        });
    }

    if let Some(timing) = action_timing(inputs)
        && timing.median_ms < game.min_reaction_ms
    {
        findings.push(Finding {
            flag: FlagType::InhumanReaction,
            severity: Severity::Medium,
            weight: WEIGHT_INHUMAN_REACTION,
            detail: format!(
                "median action delta {:.1}ms below {:.1}ms",
                timing.median_ms, game.min_reaction_ms
            ),
        });
    }

    let cadence = press_timing(inputs).filter(|t| t.is_machine_like(settings));
    let holds = hold_timing(inputs).filter(|t| t.is_machine_like(settings));
    if let Some((label, timing)) = cadence
        .map(|t| ("press cadence", t))
        .or(holds.map(|t| ("hold duration", t)))
    {
        findings.push(Finding {
            flag: FlagType::BotFrequency,
            severity: Severity::High,
            weight: WEIGHT_BOT_TIMING,
            detail: format!(
                "uniform {label}: mean {:.1}ms, cv {:.3} over {} samples",
                timing.mean_ms, timing.cv, timing.samples
            ),
        });
    }

    // Rates use the reported duration, falling back to the input span when
    // the client reports zero.
    let span_ms = inputs.iter().map(|i| i.t).max().unwrap_or(0);
    let effective_ms = if duration_ms > 0 { duration_ms } else { span_ms };
    if effective_ms > 0 {
        let seconds = effective_ms as f64 / 1000.0;

        let input_rate = inputs.len() as f64 / seconds;
        if input_rate > game.max_inputs_per_second {
            findings.push(Finding {
                flag: FlagType::AbnormalVelocity,
                severity: Severity::Medium,
                weight: WEIGHT_INPUT_RATE,
                detail: format!(
                    "{input_rate:.1} inputs/s above {:.1}",
                    game.max_inputs_per_second
                ),
            });
        }

        let points_rate = claimed_score as f64 / seconds;
        if points_rate > game.points_per_second_limit {
            findings.push(Finding {
                flag: FlagType::AbnormalVelocity,
                severity: Severity::Medium,
                weight: WEIGHT_POINTS_RATE,
                detail: format!(
                    "{points_rate:.1} points/s above {:.1}",
                    game.points_per_second_limit
                ),
            });
        }
    }

    if duration_ms < game.min_game_duration_ms && claimed_score > 0 {
        findings.push(Finding {
            flag: FlagType::AbnormalVelocity,
            severity: Severity::Medium,
            weight: WEIGHT_SHORT_DURATION,
            detail: format!(
                "duration {duration_ms}ms below minimum {}ms",
                game.min_game_duration_ms
            ),
        });
    }

    let perfect_floor = game.max_theoretical_score as f64 * settings.perfect_play_ratio;
    if claimed_score > 0
        && claimed_score as f64 >= perfect_floor
        && claimed_score <= game.max_theoretical_score
    {
        findings.push(Finding {
            flag: FlagType::PerfectPlay,
            severity: Severity::Low,
            weight: WEIGHT_PERFECT_PLAY,
            detail: format!("score {claimed_score} within reach of theoretical max"),
        });
    }

    Analysis::from_findings(findings)
}
