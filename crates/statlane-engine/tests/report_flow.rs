//! End-to-end read-path flow: resolve a range, compile filters, run the
//! chart query against a canned store, and align the rows onto the axis.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use statlane_core::filters::FilterSpec;
use statlane_core::granularity::{Granularity, Period};
use statlane_core::params::ParamMap;
use statlane_core::store::{EventStore, ANALYTICS_TABLE};
use statlane_engine::align::{align, SeriesRow};
use statlane_engine::axis;
use statlane_engine::columns::EventScope;
use statlane_engine::filter_compiler;
use statlane_engine::time_buckets::{resolve, TimeRangeRequest};

struct CannedStore {
    rows: Vec<Value>,
}

#[async_trait]
impl EventStore for CannedStore {
    async fn query(&self, _sql: &str, _params: &ParamMap) -> anyhow::Result<Vec<Value>> {
        Ok(self.rows.clone())
    }

    async fn insert(&self, _table: &str, _rows: Vec<Value>) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn chart_flow_produces_dense_series_from_sparse_rows() {
    let request = TimeRangeRequest {
        period: Some(Period::LastSevenDays),
        granularity: Some(Granularity::Day),
        timezone: "UTC".to_string(),
        ..TimeRangeRequest::default()
    };
    let now = Utc
        .with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
        .single()
        .unwrap_or_default();
    let range = resolve(&request, now).ok();
    let Some(range) = range else {
        panic!("range resolution failed");
    };

    let hostile = "BG'; DROP TABLE analytics;--";
    let (compiled, applied) = filter_compiler::compile(
        &[FilterSpec::new("cc", hostile)],
        EventScope::Pageviews,
        false,
    );
    assert_eq!(applied.len(), 1);

    // Assemble the chart query the way a reporting caller does: base
    // predicate from the resolved range, compiled fragment appended.
    let sql = format!(
        "SELECT toYear(created) AS year, toMonth(created) AS month, \
         toDayOfMonth(created) AS day, count() AS pageviews, \
         count(DISTINCT psid) AS visitors \
         FROM {ANALYTICS_TABLE} \
         WHERE pid = {{pid:String}} \
         AND created BETWEEN {{from:String}} AND {{to:String}} {} \
         GROUP BY year, month, day ORDER BY year, month, day",
        compiled.predicate
    );
    assert!(!sql.contains(hostile), "literal leaked into query text");

    let mut params = ParamMap::new();
    params.insert("pid", "proj1");
    params.insert("from", range.from_utc_str());
    params.insert("to", range.to_utc_str());
    params.merge(compiled.params);
    assert_eq!(params.get("qf_0_0"), Some(hostile));

    let store = CannedStore {
        rows: vec![
            json!({"year": 2024, "month": 6, "day": 10, "pageviews": 12, "visitors": 5}),
            json!({"year": 2024, "month": 6, "day": 14, "pageviews": 3, "visitors": 2}),
            // Outside the axis; must be dropped, not misplaced.
            json!({"year": 2024, "month": 5, "day": 1, "pageviews": 99, "visitors": 99}),
        ],
    };
    let raw_rows = store.query(&sql, &params).await.unwrap_or_default();

    let value_fields = ["pageviews", "visitors"];
    let rows: Vec<SeriesRow> = raw_rows
        .iter()
        .filter_map(|r| SeriesRow::from_row(r, &value_fields))
        .collect();
    assert_eq!(rows.len(), 3);

    let axis = axis::generate(
        range.granularity,
        range.from_local,
        range.to_local,
        "UTC",
    )
    .ok();
    let Some(axis) = axis else {
        panic!("axis generation failed");
    };
    assert_eq!(axis.len(), 8, "7d window spans 8 day buckets inclusive");
    assert_eq!(axis.utc, axis.local);

    let aligned = align(&rows, &axis.local, &value_fields);
    let pageviews = aligned.get("pageviews").cloned().unwrap_or_default();
    let visitors = aligned.get("visitors").cloned().unwrap_or_default();
    assert_eq!(pageviews.len(), axis.len());

    let ten_jun = axis.local.iter().position(|l| l == "2024-06-10");
    let fourteen_jun = axis.local.iter().position(|l| l == "2024-06-14");
    assert_eq!(ten_jun.map(|i| pageviews[i]), Some(12.0));
    assert_eq!(fourteen_jun.map(|i| visitors[i]), Some(2.0));
    let total: f64 = pageviews.iter().sum();
    assert_eq!(total, 15.0, "off-axis row must not contribute");
}
