//! Service configuration.
//!
//! Built once at startup and passed into [`crate::ScoreService::new`]; never
//! mutated afterwards. Every field has a default, so a TOML file only needs to
//! name what it overrides.
//!
//! ```toml
//! reject_confidence = 0.8
//! admins = ["0xadmin"]
//!
//! [escalation]
//! high_threshold = 3
//!
//! [games.tetra]
//! maxTheoreticalScore = 1000
//! minGameDurationMs = 2000
//! maxInputsPerSecond = 10
//! pointsPerSecondLimit = 50
//! ```

use std::collections::BTreeSet;

use scoreguard_sim::GameConfigTable;
use serde::Deserialize;

use crate::analysis::AnalysisSettings;
use crate::error::ConfigError;
use crate::escalation::EscalationPolicy;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Per-game bounds. Rows given in TOML are added to the builtin table.
    pub games: GameConfigTable,
    pub analysis: AnalysisSettings,
    pub escalation: EscalationPolicy,
    /// Analyzer confidence above which a submission is rejected.
    pub reject_confidence: f64,
    /// Analyzer confidence above which a medium flag is recorded.
    pub flag_confidence: f64,
    /// Exact replay tolerance as a fraction of the claimed score.
    pub score_tolerance_ratio: f64,
    /// Exact replay tolerance floor, in points.
    pub score_tolerance_min: u64,
    /// Estimated replay: claimed may exceed the estimate by this factor.
    pub estimated_ratio_bound: f64,
    /// Lowercase addresses allowed on the admin surface.
    pub admins: BTreeSet<String>,
    pub leaderboard_size: usize,
    pub max_inputs: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            games: GameConfigTable::builtin(),
            analysis: AnalysisSettings::default(),
            escalation: EscalationPolicy::default(),
            reject_confidence: 0.7,
            flag_confidence: 0.4,
            score_tolerance_ratio: 0.01,
            score_tolerance_min: 1,
            estimated_ratio_bound: 20.0,
            admins: BTreeSet::new(),
            leaderboard_size: 100,
            max_inputs: 20_000,
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let mut config: ServiceConfig = toml::from_str(source)?;

        let mut games = GameConfigTable::builtin();
        for (game_id, row) in std::mem::take(&mut config.games) {
            games.insert(game_id, row);
        }
        config.games = games;
        config.admins = config
            .admins
            .iter()
            .map(|a| a.to_ascii_lowercase())
            .collect();

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.flag_confidence)
            || !(0.0..=1.0).contains(&self.reject_confidence)
            || self.flag_confidence > self.reject_confidence
        {
            return Err(ConfigError::Invalid(format!(
                "confidence thresholds must satisfy 0 <= flag ({}) <= reject ({}) <= 1",
                self.flag_confidence, self.reject_confidence
            )));
        }
        if self.estimated_ratio_bound < 1.0 {
            return Err(ConfigError::Invalid(
                "estimated_ratio_bound must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Exact replay tolerance for a claimed score.
    pub fn score_tolerance(&self, claimed: u64) -> f64 {
        (claimed as f64 * self.score_tolerance_ratio).max(self.score_tolerance_min as f64)
    }

    pub fn is_admin(&self, address: &str) -> bool {
        self.admins.contains(address)
    }
}
