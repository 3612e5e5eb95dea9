//! The write path: screen, derive identities, enrich, store.

use std::sync::Arc;

use chrono::Utc;

use statlane_cache::Cache;
use statlane_core::config::Config;
use statlane_core::event::TrackPayload;
use statlane_core::store::EventStore;

use crate::enrich::Enricher;
use crate::identity::{session_key, IdentityDeriver};
use crate::screen::{screen, Outcome};

/// Orchestrates event ingestion. Stateless; one instance is shared across
/// request handlers.
pub struct Ingestor {
    deriver: IdentityDeriver,
    enricher: Enricher,
    store: Arc<dyn EventStore>,
    config: Config,
}

impl Ingestor {
    pub fn new(store: Arc<dyn EventStore>, cache: Arc<dyn Cache>, config: Config) -> Self {
        Self {
            deriver: IdentityDeriver::new(cache),
            enricher: Enricher::new(&config.geoip_path),
            store,
            config,
        }
    }

    /// Ingest one track request.
    ///
    /// Returns the screening outcome; `Ignored` and `Rejected` requests
    /// are not stored. Only store/salt failures surface as errors.
    pub async fn track(
        &self,
        payload: TrackPayload,
        ip: &str,
        user_agent: &str,
    ) -> anyhow::Result<Outcome> {
        let outcome = screen(&payload, user_agent, &self.config);
        match &outcome {
            Outcome::Accepted => {}
            Outcome::Ignored(reason) => {
                tracing::debug!(%reason, pid = %payload.pid, "ignoring track request");
                return Ok(outcome);
            }
            Outcome::Rejected(reason) => {
                tracing::debug!(%reason, pid = %payload.pid, "rejecting track request");
                return Ok(outcome);
            }
        }

        let psid = self.deriver.session_id(&payload.pid, user_agent, ip).await?;
        let key = session_key(&payload.pid, &psid);
        let is_new_session = self
            .deriver
            .try_start_session(&key, self.config.session_ttl_seconds)
            .await;
        let profile = self
            .deriver
            .profile_id(&payload.pid, user_agent, ip, payload.user_id.as_deref())
            .await?;

        let row = self.enricher.build_row(
            &payload,
            ip,
            user_agent,
            &psid,
            Some(profile),
            is_new_session,
            Utc::now(),
        );
        let table = row.table();
        self.store.insert(table, vec![row.into_value()?]).await?;
        Ok(Outcome::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;
    use statlane_cache::MemoryCache;
    use statlane_core::params::ParamMap;
    use tokio::sync::Mutex;

    use super::*;

    const CHROME_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    #[derive(Default)]
    struct CapturingStore {
        inserts: Mutex<Vec<(String, Vec<Value>)>>,
    }

    #[async_trait]
    impl EventStore for CapturingStore {
        async fn query(&self, _sql: &str, _params: &ParamMap) -> anyhow::Result<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn insert(&self, table: &str, rows: Vec<Value>) -> anyhow::Result<()> {
            self.inserts.lock().await.push((table.to_string(), rows));
            Ok(())
        }
    }

    fn payload(event_type: &str) -> TrackPayload {
        TrackPayload {
            pid: "proj1".to_string(),
            event_type: event_type.to_string(),
            pg: Some("/".to_string()),
            prev: None,
            referrer: None,
            lc: Some("en-US".to_string()),
            so: None,
            me: None,
            ca: None,
            te: None,
            co: None,
            ev: None,
            meta: None,
            tags: None,
            name: None,
            message: None,
            filename: None,
            user_id: None,
        }
    }

    fn ingestor(store: Arc<CapturingStore>) -> Ingestor {
        Ingestor::new(store, Arc::new(MemoryCache::new()), Config::default())
    }

    #[tokio::test]
    async fn pageviews_are_stored_with_derived_identities() {
        let store = Arc::new(CapturingStore::default());
        let ingestor = ingestor(Arc::clone(&store));

        let outcome = ingestor.track(payload("pageview"), "10.0.0.1", CHROME_UA).await.ok();
        assert_eq!(outcome, Some(Outcome::Accepted));

        let inserts = store.inserts.lock().await;
        assert_eq!(inserts.len(), 1);
        let (table, rows) = &inserts[0];
        assert_eq!(table, "analytics");
        let row = &rows[0];
        let psid = row.get("psid").and_then(Value::as_str).unwrap_or("");
        assert!(!psid.is_empty() && psid.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(row.get("unique").and_then(Value::as_bool), Some(true));
        // No raw request attributes alongside the derived ids.
        assert!(row.get("ip").is_none());
        assert!(row.get("user_agent").is_none());
        let profile = row.get("profile").and_then(Value::as_str).unwrap_or("");
        assert!(profile.starts_with("anon-"));
    }

    #[tokio::test]
    async fn second_pageview_in_a_session_is_not_unique() {
        let store = Arc::new(CapturingStore::default());
        let ingestor = ingestor(Arc::clone(&store));

        ingestor.track(payload("pageview"), "10.0.0.1", CHROME_UA).await.ok();
        ingestor.track(payload("pageview"), "10.0.0.1", CHROME_UA).await.ok();

        let inserts = store.inserts.lock().await;
        assert_eq!(inserts.len(), 2);
        let uniques: Vec<Option<bool>> = inserts
            .iter()
            .map(|(_, rows)| rows[0].get("unique").and_then(Value::as_bool))
            .collect();
        assert_eq!(uniques, vec![Some(true), Some(false)]);
    }

    #[tokio::test]
    async fn custom_events_go_to_their_own_table() {
        let store = Arc::new(CapturingStore::default());
        let ingestor = ingestor(Arc::clone(&store));

        let mut custom = payload("custom");
        custom.ev = Some("signup".to_string());
        custom.meta = Some(serde_json::json!({"plan": "pro"}));
        ingestor.track(custom, "10.0.0.1", CHROME_UA).await.ok();

        let inserts = store.inserts.lock().await;
        let (table, rows) = &inserts[0];
        assert_eq!(table, "customev");
        let row = &rows[0];
        assert_eq!(row.get("ev").and_then(Value::as_str), Some("signup"));
        assert_eq!(
            row.get("meta.key").and_then(Value::as_array).map(Vec::len),
            Some(1)
        );
    }

    #[tokio::test]
    async fn ignored_requests_are_never_stored() {
        let store = Arc::new(CapturingStore::default());
        let ingestor = ingestor(Arc::clone(&store));

        let outcome = ingestor
            .track(
                payload("pageview"),
                "10.0.0.1",
                "Googlebot/2.1 (+http://www.google.com/bot.html)",
            )
            .await
            .ok();
        assert!(matches!(outcome, Some(Outcome::Ignored(_))));
        assert!(store.inserts.lock().await.is_empty());
    }
}
