//! Columnar store abstraction.

use crate::params::ParamMap;

/// Query/insert boundary to the columnar event store.
///
/// The engine only ever hands over query text plus a named-parameter map
/// and consumes JSON row objects back; it never concatenates literals into
/// SQL. Implementations are expected to support window functions and array
/// columns (the generated fragments target the ClickHouse dialect).
#[async_trait::async_trait]
pub trait EventStore: Send + Sync + 'static {
    async fn query(&self, sql: &str, params: &ParamMap)
        -> anyhow::Result<Vec<serde_json::Value>>;

    async fn insert(&self, table: &str, rows: Vec<serde_json::Value>) -> anyhow::Result<()>;
}

/// Pageviews table. Entry/exit-page subqueries always target this table.
pub const ANALYTICS_TABLE: &str = "analytics";
/// Custom events table, with `meta.key` / `meta.value` array columns.
pub const CUSTOM_EVENTS_TABLE: &str = "customev";
pub const ERRORS_TABLE: &str = "errors";
pub const PERFORMANCE_TABLE: &str = "performance";
