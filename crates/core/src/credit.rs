//! Credit ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::UserProfile;
use crate::types::{CreditLogId, CreditLogKind, Dinars, UserId};

/// A stored `credit_logs` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLog {
    pub id: CreditLogId,
    pub user_id: UserId,
    /// Signed change applied to the balance.
    pub amount: Dinars,
    pub kind: CreditLogKind,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    /// Email of the admin who made the adjustment.
    pub actor: Option<String>,
}

/// A ledger entry before it is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCreditLog {
    pub user_id: UserId,
    pub amount: Dinars,
    pub kind: CreditLogKind,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub actor: Option<String>,
}

impl NewCreditLog {
    #[must_use]
    pub fn with_id(self, id: CreditLogId) -> CreditLog {
        CreditLog {
            id,
            user_id: self.user_id,
            amount: self.amount,
            kind: self.kind,
            reason: self.reason,
            created_at: self.created_at,
            actor: self.actor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CreditError {
    #[error("credit adjustment cannot be zero")]
    ZeroAmount,
    #[error("credit balance out of range")]
    Overflow,
}

/// The admin "adjust credit" form: a signed whole-dinar amount and a
/// free-text reason.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreditAdjustment {
    pub amount: i64,
    pub reason: String,
}

impl CreditAdjustment {
    /// New balance and the ledger entry for applying this adjustment to
    /// `profile`.
    ///
    /// # Errors
    ///
    /// Returns [`CreditError::ZeroAmount`] for a zero amount and
    /// [`CreditError::Overflow`] if the balance would overflow.
    pub fn apply(
        &self,
        profile: &UserProfile,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(Dinars, NewCreditLog), CreditError> {
        if self.amount == 0 {
            return Err(CreditError::ZeroAmount);
        }
        let amount = Dinars::from_whole(self.amount);
        let balance = profile
            .credit
            .checked_add(amount)
            .ok_or(CreditError::Overflow)?;

        let log = NewCreditLog {
            user_id: profile.uid.clone(),
            amount,
            kind: CreditLogKind::AdminAdjustment,
            reason: self.reason.trim().to_owned(),
            created_at: now,
            actor: actor.map(str::to_owned),
        };
        Ok((balance, log))
    }
}

/// Newest entries first.
pub fn sort_newest_first(logs: &mut [CreditLog]) {
    logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn profile(credit: Dinars) -> UserProfile {
        UserProfile {
            credit,
            ..UserProfile::first_sign_in(UserId::new("u1"), "a@b.dz", Utc::now())
        }
    }

    #[test]
    fn test_apply_adds_signed_amount() {
        let adjustment = CreditAdjustment {
            amount: -50,
            reason: " spam ".to_owned(),
        };
        let (balance, log) = adjustment
            .apply(&profile(Dinars::from_whole(100)), Some("admin@gamewar.dz"), Utc::now())
            .unwrap();
        assert_eq!(balance, Dinars::from_whole(50));
        assert_eq!(log.amount, Dinars::from_whole(-50));
        assert_eq!(log.kind, CreditLogKind::AdminAdjustment);
        assert_eq!(log.reason, "spam");
        assert_eq!(log.actor.as_deref(), Some("admin@gamewar.dz"));
    }

    #[test]
    fn test_apply_rejects_zero_and_overflow() {
        let zero = CreditAdjustment::default();
        assert_eq!(
            zero.apply(&profile(Dinars::from_whole(100)), None, Utc::now()),
            Err(CreditError::ZeroAmount)
        );

        let huge = CreditAdjustment {
            amount: 1,
            reason: String::new(),
        };
        assert_eq!(
            huge.apply(&profile(Dinars::new(Decimal::MAX)), None, Utc::now()),
            Err(CreditError::Overflow)
        );
    }

    #[test]
    fn test_apply_keeps_fractional_balance() {
        let adjustment = CreditAdjustment {
            amount: 10,
            reason: "bonus".to_owned(),
        };
        let (balance, _) = adjustment
            .apply(&profile(Dinars::new(Decimal::new(125, 1))), None, Utc::now())
            .unwrap();
        assert_eq!(balance, Dinars::new(Decimal::new(225, 1)));
    }
}
