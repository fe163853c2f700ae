//! Account role and status changes.
//!
//! # Usage
//!
//! ```bash
//! gw-cli user role client@gamewar.dz seller
//! gw-cli user status kX9a2 active
//! ```

use tracing::info;

use gamewar_core::{UserRole, UserStatus};

use super::{AdminSession, CommandError};

/// Set the role of an account, found by uid or email.
///
/// # Errors
///
/// Returns an error if the account is unknown or the write fails.
pub async fn set_role(session: &AdminSession, user: &str, role: UserRole) -> Result<(), CommandError> {
    let profile = session.find_user(user).await?;
    if profile.role == role {
        info!(uid = %profile.uid, %role, "Role already set, nothing to do");
        return Ok(());
    }
    session
        .back_office()
        .set_role(session.auth(), &profile.uid, role)
        .await?;
    info!(uid = %profile.uid, from = %profile.role, to = %role, "Role updated");
    Ok(())
}

/// Set the activation status of an account, found by uid or email.
///
/// # Errors
///
/// Returns an error if the account is unknown or the write fails.
pub async fn set_status(
    session: &AdminSession,
    user: &str,
    status: UserStatus,
) -> Result<(), CommandError> {
    let profile = session.find_user(user).await?;
    if profile.status == status {
        info!(uid = %profile.uid, %status, "Status already set, nothing to do");
        return Ok(());
    }
    session
        .back_office()
        .set_status(session.auth(), &profile.uid, status)
        .await?;
    info!(uid = %profile.uid, from = %profile.status, to = %status, "Status updated");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gamewar_core::UserId;

    use super::super::test_support::{self, CUSTOMER_EMAIL};
    use super::*;

    #[tokio::test]
    async fn test_set_role_and_status() {
        let (memory, session) = test_support::seeded().await;

        set_role(&session, CUSTOMER_EMAIL, UserRole::Seller).await.unwrap();
        set_status(&session, "client-uid", UserStatus::Active).await.unwrap();

        let profile = memory.profile(&UserId::new("client-uid")).await.unwrap();
        assert_eq!(profile.role, UserRole::Seller);
        assert_eq!(profile.status, UserStatus::Active);
    }

    #[tokio::test]
    async fn test_unknown_user_is_reported() {
        let (_, session) = test_support::seeded().await;
        let result = set_role(&session, "ghost@gamewar.dz", UserRole::Admin).await;
        assert!(matches!(result, Err(CommandError::UnknownUser(_))));
    }
}
