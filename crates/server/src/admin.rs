//! Admin surface: ban state inspection and manual moderation.
//!
//! Every call authorizes the caller first. Admins come from the config
//! allowlist or the `is_admin` bit on their own account record.

use serde::Serialize;

use crate::error::{AdminError, StoreError};
use crate::escalation::{self, FlagHistory, PlayerAccount};
use crate::{ScoreService, normalize_caller};

/// Ban and flag state of one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BanInfo {
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub banned_at: Option<u64>,
    pub flags: FlagHistory,
}

impl From<PlayerAccount> for BanInfo {
    fn from(account: PlayerAccount) -> Self {
        Self {
            is_banned: account.is_banned,
            ban_reason: account.ban_reason,
            banned_at: account.banned_at,
            flags: account.flags,
        }
    }
}

impl ScoreService {
    fn authorize_admin(&self, caller: Option<&str>) -> Result<String, AdminError> {
        let caller = normalize_caller(caller).ok_or(AdminError::Unauthenticated)?;
        let allowed = self.config().is_admin(&caller)
            || self.players().get(&caller).is_some_and(|a| a.is_admin);
        if !allowed {
            tracing::warn!(caller, "Admin call rejected");
            return Err(AdminError::NotAdmin(caller));
        }
        Ok(caller)
    }

    pub fn get_user_ban_info(
        &self,
        caller: Option<&str>,
        target: &str,
    ) -> Result<BanInfo, AdminError> {
        self.authorize_admin(caller)?;
        let target = target.to_ascii_lowercase();
        self.players()
            .get(&target)
            .map(BanInfo::from)
            .ok_or(AdminError::Store(StoreError::PlayerNotFound(target)))
    }

    pub fn ban_account(
        &self,
        caller: Option<&str>,
        target: &str,
        reason: &str,
    ) -> Result<BanInfo, AdminError> {
        let admin = self.authorize_admin(caller)?;
        let target = target.to_ascii_lowercase();
        tracing::info!(admin, target, "Admin ban requested");
        let now = self.clock.now_ms();
        Ok(escalation::ban_account(self.players(), &target, reason, now)?.into())
    }

    pub fn unban_account(&self, caller: Option<&str>, target: &str) -> Result<BanInfo, AdminError> {
        let admin = self.authorize_admin(caller)?;
        let target = target.to_ascii_lowercase();
        tracing::info!(admin, target, "Admin unban requested");
        Ok(escalation::unban_account(self.players(), &target)?.into())
    }

    /// Reset flag history without touching ban state.
    pub fn clear_user_flags(
        &self,
        caller: Option<&str>,
        target: &str,
    ) -> Result<BanInfo, AdminError> {
        let admin = self.authorize_admin(caller)?;
        let target = target.to_ascii_lowercase();
        tracing::info!(admin, target, "Admin flag reset requested");
        Ok(escalation::clear_flags(self.players(), &target)?.into())
    }

    /// Accounts with flags, most flagged first.
    pub fn get_flagged_users(
        &self,
        caller: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PlayerAccount>, AdminError> {
        self.authorize_admin(caller)?;
        Ok(self.players().flagged(limit))
    }
}
