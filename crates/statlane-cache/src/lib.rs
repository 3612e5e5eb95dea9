pub mod memory;

pub use memory::MemoryCache;

use async_trait::async_trait;

/// Key-value cache with TTLs and atomic set-if-absent.
///
/// Session-start detection and salt state live behind this trait. A
/// single-node deployment uses the bundled [`MemoryCache`]; multi-node
/// deployments swap in a Redis-backed implementation without touching the
/// identity layer. `set_nx` is the only operation whose atomicity matters:
/// two concurrent writers for the same key must see exactly one `true`.
#[async_trait]
pub trait Cache: Send + Sync + 'static {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Set `key` unconditionally with a TTL.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<()>;

    /// Set `key` only if absent. Returns `true` when this call created it.
    async fn set_nx(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<bool>;

    async fn exists(&self, key: &str) -> anyhow::Result<bool>;
}
