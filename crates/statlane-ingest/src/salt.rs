//! Rotating identity salts.
//!
//! A salt lives in the cache under a fixed key with a TTL that ends at the
//! rotation boundary. Rotation is nothing more than expiry: the next
//! derivation finds no salt and creates a fresh one. No versioning is
//! needed because derivation always re-reads the current value.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};

use statlane_cache::Cache;

const SALT_BYTES: usize = 32;

/// How often a salt class rotates. Session salts rotate daily so session
/// ids are linkable for at most a day; profile salts rotate monthly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltRotation {
    Daily,
    Monthly,
}

impl SaltRotation {
    pub fn cache_key(&self) -> &'static str {
        match self {
            Self::Daily => "salt:daily",
            Self::Monthly => "salt:monthly",
        }
    }

    /// Seconds from `now` to this class's next rotation boundary (UTC
    /// midnight / first of next month).
    pub fn ttl_seconds(&self, now: DateTime<Utc>) -> u64 {
        let today = now.date_naive();
        let boundary = match self {
            Self::Daily => (today + Duration::days(1)).and_hms_opt(0, 0, 0),
            Self::Monthly => NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
                .and_then(|first| first.checked_add_months(Months::new(1)))
                .and_then(|next| next.and_hms_opt(0, 0, 0)),
        };
        match boundary {
            Some(boundary) => (boundary - now.naive_utc()).num_seconds().max(1) as u64,
            None => 1,
        }
    }
}

/// Generate a cryptographically random hex string of `n` bytes (2n hex chars).
pub(crate) fn rand_hex(n: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Fetch the current salt for a rotation class, creating it lazily.
///
/// Creation goes through `set_nx` so concurrent first users converge on a
/// single value; the loser of the race re-reads the winner's salt.
pub async fn current_salt(
    cache: &dyn Cache,
    rotation: SaltRotation,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let key = rotation.cache_key();
    if let Some(existing) = cache.get(key).await? {
        return Ok(existing);
    }
    let salt = rand_hex(SALT_BYTES);
    if cache.set_nx(key, &salt, rotation.ttl_seconds(now)).await? {
        tracing::info!(key, "created fresh identity salt");
        return Ok(salt);
    }
    cache
        .get(key)
        .await?
        .ok_or_else(|| anyhow::anyhow!("salt expired between creation race and read"))
}
