//! Cache-backed identity derivation.

use std::sync::Arc;

use chrono::Utc;

use statlane_cache::Cache;
use statlane_core::identity::{
    anonymous_profile_id, derive_identity_digits, derive_linked_profile_digits,
    identified_profile_id,
};

use crate::salt::{current_salt, SaltRotation};

/// Derives session and profile identities on the write path.
///
/// Stateless apart from the injected cache; safe to share across request
/// handlers. Salts are fetched per derivation call and never held longer —
/// that is what makes expiry-based rotation correct.
pub struct IdentityDeriver {
    cache: Arc<dyn Cache>,
}

impl IdentityDeriver {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Derive the session id for a request under the current daily salt.
    pub async fn session_id(
        &self,
        project_id: &str,
        user_agent: &str,
        ip: &str,
    ) -> anyhow::Result<String> {
        let salt = current_salt(self.cache.as_ref(), SaltRotation::Daily, Utc::now()).await?;
        Ok(derive_identity_digits(user_agent, ip, project_id, &salt))
    }

    /// Derive the profile id under the current monthly salt.
    ///
    /// With a caller-supplied user id the profile follows the user across
    /// devices and gets the identified tag; otherwise it is derived from
    /// the request attributes and tagged anonymous.
    pub async fn profile_id(
        &self,
        project_id: &str,
        user_agent: &str,
        ip: &str,
        supplied_user_id: Option<&str>,
    ) -> anyhow::Result<String> {
        let salt = current_salt(self.cache.as_ref(), SaltRotation::Monthly, Utc::now()).await?;
        Ok(match supplied_user_id {
            Some(user_id) => {
                identified_profile_id(&derive_linked_profile_digits(project_id, user_id, &salt))
            }
            None => anonymous_profile_id(&derive_identity_digits(
                user_agent, ip, project_id, &salt,
            )),
        })
    }

    /// Atomically detect whether this request starts a new session.
    ///
    /// The cache's set-if-absent is the only synchronization point: under
    /// concurrent writers exactly one call sees `true`. A lost race still
    /// refreshes the TTL so long-lived sessions don't expire mid-visit.
    /// Cache unavailability degrades to "new session" — losing dedup is
    /// less harmful than dropping the event.
    pub async fn try_start_session(&self, session_key: &str, ttl_seconds: u64) -> bool {
        match self.cache.set_nx(session_key, "1", ttl_seconds).await {
            Ok(created) => {
                if !created {
                    if let Err(error) = self.cache.set_ex(session_key, "1", ttl_seconds).await {
                        tracing::warn!(%error, session_key, "could not refresh session ttl");
                    }
                }
                created
            }
            Err(error) => {
                tracing::warn!(%error, "cache unavailable, treating request as a new session");
                true
            }
        }
    }
}

/// Cache key under which a derived session is tracked.
pub fn session_key(project_id: &str, session_digits: &str) -> String {
    format!("sid:{project_id}:{session_digits}")
}
