//! Profile resolution for signed-in accounts.
//!
//! Every page needs the visitor's role and status, so resolved profiles are
//! cached for a short time. Admin changes to a profile invalidate its entry.

use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use tracing::instrument;

use gamewar_core::{CreditLog, UserId, UserProfile, credit};

use crate::backend::{AuthSession, Backend, BackendError};

const PROFILE_TTL: Duration = Duration::from_secs(30);
const MAX_CACHED_PROFILES: u64 = 10_000;

/// Looks up, and on first sign-in creates, the stored profile of an account.
#[derive(Clone)]
pub struct ProfileResolver {
    backend: Backend,
    cache: Cache<UserId, UserProfile>,
}

impl ProfileResolver {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHED_PROFILES)
            .time_to_live(PROFILE_TTL)
            .build();
        Self { backend, cache }
    }

    /// The profile of the signed-in account.
    ///
    /// An account without a profile document gets the first-sign-in profile
    /// written for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be read or created.
    #[instrument(skip(self, auth), fields(uid = %auth.uid))]
    pub async fn resolve(&self, auth: &AuthSession) -> Result<UserProfile, BackendError> {
        if let Some(profile) = self.cache.get(&auth.uid).await {
            return Ok(profile);
        }

        let profile = match self.backend.get_profile(auth, &auth.uid).await? {
            Some(profile) => profile,
            None => {
                let profile =
                    UserProfile::first_sign_in(auth.uid.clone(), auth.email.clone(), Utc::now());
                self.backend.put_profile(auth, &profile).await?;
                tracing::info!(uid = %auth.uid, "Created profile on first sign-in");
                profile
            }
        };

        self.cache.insert(auth.uid.clone(), profile.clone()).await;
        Ok(profile)
    }

    /// Drop the cached profile of `uid`.
    pub async fn invalidate(&self, uid: &UserId) {
        self.cache.invalidate(uid).await;
    }

    /// Credit ledger of the signed-in account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    #[instrument(skip(self, auth), fields(uid = %auth.uid))]
    pub async fn credit_history(&self, auth: &AuthSession) -> Result<Vec<CreditLog>, BackendError> {
        let mut logs = self.backend.credit_logs_for(auth, &auth.uid).await?;
        credit::sort_newest_first(&mut logs);
        Ok(logs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gamewar_core::{Dinars, UserRole, UserStatus};

    use super::*;
    use crate::backend::{MemoryBackend, ProfilePatch};

    #[tokio::test]
    async fn test_first_sign_in_creates_active_profile() {
        let memory = MemoryBackend::new();
        let uid = memory.add_account("new@gamewar.dz", "123456", None).await;
        let backend = Backend::from(memory.clone());
        let auth = backend.sign_in("new@gamewar.dz", "123456").await.unwrap();

        let profile = ProfileResolver::new(backend).resolve(&auth).await.unwrap();
        assert_eq!(profile.role, UserRole::User);
        assert_eq!(profile.status, UserStatus::Active);
        assert_eq!(profile.credit, Dinars::from_whole(100));
        assert_eq!(memory.profile(&uid).await, Some(profile));
    }

    #[tokio::test]
    async fn test_invalidate_rereads_profile() {
        let memory = MemoryBackend::new();
        memory.add_account("a@gamewar.dz", "123456", None).await;
        let backend = Backend::from(memory);
        let auth = backend.sign_in("a@gamewar.dz", "123456").await.unwrap();
        let resolver = ProfileResolver::new(backend.clone());

        resolver.resolve(&auth).await.unwrap();
        backend
            .update_profile(&auth, &auth.uid, &ProfilePatch::role(UserRole::Seller))
            .await
            .unwrap();
        assert_eq!(resolver.resolve(&auth).await.unwrap().role, UserRole::User);

        resolver.invalidate(&auth.uid).await;
        assert_eq!(resolver.resolve(&auth).await.unwrap().role, UserRole::Seller);
    }
}
