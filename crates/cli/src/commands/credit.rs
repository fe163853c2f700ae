//! Manual credit adjustments.
//!
//! # Usage
//!
//! ```bash
//! gw-cli credit adjust client@gamewar.dz 500 --reason "Tournament prize"
//! gw-cli credit adjust kX9a2 -200 --reason "Returned controller"
//! ```

use tracing::info;

use gamewar_core::{CreditAdjustment, Dinars};

use super::{AdminSession, CommandError};

/// Add `amount` (negative to remove) to an account's credit and record it
/// in the credit ledger.
///
/// # Errors
///
/// Returns an error for a zero amount, an unknown account, or a failed
/// write.
pub async fn adjust(
    session: &AdminSession,
    user: &str,
    amount: i64,
    reason: &str,
) -> Result<Dinars, CommandError> {
    let profile = session.find_user(user).await?;
    let adjustment = CreditAdjustment {
        amount,
        reason: reason.trim().to_owned(),
    };
    let balance = session
        .back_office()
        .adjust_credit(session.auth(), &profile.uid, &adjustment)
        .await?;
    info!(
        uid = %profile.uid,
        amount,
        previous = %profile.credit,
        %balance,
        "Credit adjusted"
    );
    Ok(balance)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gamewar_core::UserId;
    use gamewar_storefront::error::AppError;

    use super::super::test_support::{self, CUSTOMER_EMAIL};
    use super::*;

    #[tokio::test]
    async fn test_adjust_updates_balance() {
        let (memory, session) = test_support::seeded().await;

        assert_eq!(
            adjust(&session, CUSTOMER_EMAIL, 500, "prize").await.unwrap(),
            Dinars::from_whole(500)
        );
        assert_eq!(
            adjust(&session, CUSTOMER_EMAIL, -200, "refund").await.unwrap(),
            Dinars::from_whole(300)
        );

        let profile = memory.profile(&UserId::new("client-uid")).await.unwrap();
        assert_eq!(profile.credit, Dinars::from_whole(300));
    }

    #[tokio::test]
    async fn test_zero_amount_is_refused() {
        let (_, session) = test_support::seeded().await;
        let result = adjust(&session, CUSTOMER_EMAIL, 0, "nothing").await;
        assert!(matches!(result, Err(CommandError::App(AppError::Credit(_)))));
    }
}
