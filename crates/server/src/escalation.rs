//! Flag history and automatic ban escalation.
//!
//! # States
//!
//! ```text
//! clean ──flag──▶ flagged(n) ──threshold──▶ banned
//!   ▲                                          │
//!   └──────────── admin unban ◀────────────────┘
//! ```
//!
//! Only [`flag_account`] bans automatically. Only an admin path unbans.
//! Clearing flags does not unban: ban state and flag history are independent.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Ban reason recorded when thresholds trip.
pub const AUTO_BAN_REASON: &str = "Automatic ban due to multiple violations";

// ============================================================================
// Flags
// ============================================================================

/// Integrity signal category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    ScoreMismatch,
    ImpossibleScore,
    InhumanReaction,
    BotFrequency,
    PerfectPlay,
    AbnormalVelocity,
    MultipleViolations,
}

impl FlagType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScoreMismatch => "score_mismatch",
            Self::ImpossibleScore => "impossible_score",
            Self::InhumanReaction => "inhuman_reaction",
            Self::BotFrequency => "bot_frequency",
            Self::PerfectPlay => "perfect_play",
            Self::AbnormalVelocity => "abnormal_velocity",
            Self::MultipleViolations => "multiple_violations",
        }
    }
}

impl std::fmt::Display for FlagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One recorded integrity flag. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagReason {
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    pub severity: Severity,
    pub game_id: String,
    pub session_id: String,
    pub claimed_score: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_score: Option<u64>,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
    /// Unix ms.
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagHistory {
    pub count: u32,
    pub reasons: Vec<FlagReason>,
    pub last_flagged: Option<u64>,
}

impl FlagHistory {
    pub fn count_severity(&self, severity: Severity) -> u32 {
        self.reasons.iter().filter(|r| r.severity == severity).count() as u32
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Aggregate play statistics for ranked sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub games_played: u64,
    pub total_score: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAccount {
    /// Lowercase wallet address.
    pub address: String,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub banned_at: Option<u64>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub flags: FlagHistory,
    /// Best verified score per `gameId`.
    #[serde(default)]
    pub best_scores: BTreeMap<String, u64>,
    #[serde(default)]
    pub stats: PlayerStats,
}

impl PlayerAccount {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into().to_ascii_lowercase(),
            is_banned: false,
            ban_reason: None,
            banned_at: None,
            is_admin: false,
            flags: FlagHistory::default(),
            best_scores: BTreeMap::new(),
            stats: PlayerStats::default(),
        }
    }
}

/// Account persistence.
///
/// `modify` runs the closure under the store's lock so read-modify-write
/// sequences on one account cannot interleave.
pub trait PlayerStore: Send + Sync {
    fn get(&self, address: &str) -> Option<PlayerAccount>;

    fn insert(&self, account: PlayerAccount);

    /// Apply `f` atomically; `None` if the account does not exist.
    fn modify(
        &self,
        address: &str,
        f: &mut dyn FnMut(&mut PlayerAccount),
    ) -> Option<PlayerAccount>;

    /// Accounts with at least one flag, most flags first, then by address.
    fn flagged(&self, limit: usize) -> Vec<PlayerAccount>;
}

#[derive(Debug, Default)]
pub struct InMemoryPlayerStore {
    accounts: Mutex<HashMap<String, PlayerAccount>>,
}

impl InMemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerStore for InMemoryPlayerStore {
    fn get(&self, address: &str) -> Option<PlayerAccount> {
        self.accounts.lock().get(address).cloned()
    }

    fn insert(&self, account: PlayerAccount) {
        self.accounts.lock().insert(account.address.clone(), account);
    }

    fn modify(
        &self,
        address: &str,
        f: &mut dyn FnMut(&mut PlayerAccount),
    ) -> Option<PlayerAccount> {
        let mut accounts = self.accounts.lock();
        let account = accounts.get_mut(address)?;
        f(account);
        Some(account.clone())
    }

    fn flagged(&self, limit: usize) -> Vec<PlayerAccount> {
        let accounts = self.accounts.lock();
        let mut flagged: Vec<PlayerAccount> = accounts
            .values()
            .filter(|a| a.flags.count > 0)
            .cloned()
            .collect();
        flagged.sort_by(|a, b| {
            b.flags
                .count
                .cmp(&a.flags.count)
                .then_with(|| a.address.cmp(&b.address))
        });
        flagged.truncate(limit);
        flagged
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Auto-ban thresholds. Crossing any one bans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationPolicy {
    pub high_threshold: u32,
    pub medium_threshold: u32,
    pub total_threshold: u32,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            high_threshold: 5,
            medium_threshold: 10,
            total_threshold: 20,
        }
    }
}

impl EscalationPolicy {
    pub fn should_ban(&self, history: &FlagHistory) -> bool {
        history.count_severity(Severity::High) >= self.high_threshold
            || history.count_severity(Severity::Medium) >= self.medium_threshold
            || history.count >= self.total_threshold
    }
}

/// Result of [`flag_account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOutcome {
    /// No account record; nothing was stored.
    NoAccount,
    Recorded { count: u32 },
    /// This flag tripped a threshold.
    Banned { count: u32 },
}

// ============================================================================
// Operations
// ============================================================================

/// Append a flag and evaluate auto-ban thresholds on the updated history.
pub fn flag_account(
    store: &dyn PlayerStore,
    policy: &EscalationPolicy,
    address: &str,
    reason: FlagReason,
) -> FlagOutcome {
    let flag_type = reason.flag_type;
    let severity = reason.severity;
    let timestamp = reason.timestamp;
    let mut pending = Some(reason);
    let mut newly_banned = false;

    let updated = store.modify(address, &mut |account| {
        let Some(reason) = pending.take() else {
            return;
        };
        account.flags.reasons.push(reason);
        account.flags.count += 1;
        account.flags.last_flagged = Some(timestamp);

        if !account.is_banned && policy.should_ban(&account.flags) {
            account.is_banned = true;
            account.ban_reason = Some(AUTO_BAN_REASON.to_string());
            account.banned_at = Some(timestamp);
            newly_banned = true;
        }
    });

    let Some(account) = updated else {
        tracing::warn!(player = address, %flag_type, "Flag dropped for unknown account");
        return FlagOutcome::NoAccount;
    };

    let count = account.flags.count;
    tracing::warn!(player = address, %flag_type, ?severity, count, "Account flagged");
    if newly_banned {
        tracing::warn!(player = address, count, "Account automatically banned");
        FlagOutcome::Banned { count }
    } else {
        FlagOutcome::Recorded { count }
    }
}

/// Admin ban. Overwrites any existing ban metadata.
pub fn ban_account(
    store: &dyn PlayerStore,
    address: &str,
    reason: &str,
    now_ms: u64,
) -> Result<PlayerAccount, StoreError> {
    let account = store
        .modify(address, &mut |account| {
            account.is_banned = true;
            account.ban_reason = Some(reason.to_string());
            account.banned_at = Some(now_ms);
        })
        .ok_or_else(|| StoreError::PlayerNotFound(address.to_string()))?;
    tracing::warn!(player = address, reason, "Account banned by admin");
    Ok(account)
}

pub fn unban_account(store: &dyn PlayerStore, address: &str) -> Result<PlayerAccount, StoreError> {
    let account = store
        .modify(address, &mut |account| {
            account.is_banned = false;
            account.ban_reason = None;
            account.banned_at = None;
        })
        .ok_or_else(|| StoreError::PlayerNotFound(address.to_string()))?;
    tracing::info!(player = address, "Account unbanned");
    Ok(account)
}

/// Reset flag history. Ban state is left untouched.
pub fn clear_flags(store: &dyn PlayerStore, address: &str) -> Result<PlayerAccount, StoreError> {
    let account = store
        .modify(address, &mut |account| {
            account.flags = FlagHistory::default();
        })
        .ok_or_else(|| StoreError::PlayerNotFound(address.to_string()))?;
    tracing::info!(player = address, "Flags cleared");
    Ok(account)
}

/// Fast-path gate. Unknown accounts are not banned.
pub fn is_account_banned(store: &dyn PlayerStore, address: &str) -> bool {
    store.get(address).is_some_and(|a| a.is_banned)
}
