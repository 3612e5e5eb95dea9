use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The payload a tracking script posts on the write path.
/// Wire field "type" selects the target table: pageview, custom, or error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPayload {
    pub pid: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Page path, e.g. "/pricing".
    pub pg: Option<String>,
    /// Previous page path within the same session.
    pub prev: Option<String>,
    #[serde(rename = "ref")]
    pub referrer: Option<String>,
    /// Locale, e.g. "en-US".
    pub lc: Option<String>,
    pub so: Option<String>,
    pub me: Option<String>,
    pub ca: Option<String>,
    pub te: Option<String>,
    pub co: Option<String>,
    /// Custom event name (required when type is "custom").
    pub ev: Option<String>,
    /// Client sends a flat JSON object; stored as parallel key/value arrays.
    pub meta: Option<serde_json::Value>,
    /// Page properties, same wire shape as `meta`.
    pub tags: Option<serde_json::Value>,
    /// Error fields (type = "error").
    pub name: Option<String>,
    pub message: Option<String>,
    pub filename: Option<String>,
    /// Caller-supplied stable user id, links the profile across devices.
    pub user_id: Option<String>,
}

/// A stored pageview row. Field names mirror the analytics table columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageviewRow {
    pub id: String,
    pub pid: String,
    pub psid: String,
    pub profile: Option<String>,
    pub pg: Option<String>,
    pub prev: Option<String>,
    #[serde(rename = "ref")]
    pub referrer: Option<String>,
    pub so: Option<String>,
    pub me: Option<String>,
    pub ca: Option<String>,
    pub te: Option<String>,
    pub co: Option<String>,
    pub lc: Option<String>,
    pub dv: Option<String>,
    pub br: Option<String>,
    pub brv: Option<String>,
    pub os: Option<String>,
    pub osv: Option<String>,
    pub cc: Option<String>,
    pub rg: Option<String>,
    pub ct: Option<String>,
    #[serde(rename = "tags.key")]
    pub tag_keys: Vec<String>,
    #[serde(rename = "tags.value")]
    pub tag_values: Vec<String>,
    /// First pageview of a new session.
    pub unique: bool,
    pub created: DateTime<Utc>,
}

/// A stored custom-event row, with `meta.key` / `meta.value` array columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomEventRow {
    pub id: String,
    pub pid: String,
    pub psid: String,
    pub profile: Option<String>,
    pub ev: String,
    pub pg: Option<String>,
    #[serde(rename = "ref")]
    pub referrer: Option<String>,
    pub so: Option<String>,
    pub me: Option<String>,
    pub ca: Option<String>,
    pub te: Option<String>,
    pub co: Option<String>,
    pub lc: Option<String>,
    pub dv: Option<String>,
    pub br: Option<String>,
    pub brv: Option<String>,
    pub os: Option<String>,
    pub osv: Option<String>,
    pub cc: Option<String>,
    pub rg: Option<String>,
    pub ct: Option<String>,
    #[serde(rename = "meta.key")]
    pub meta_keys: Vec<String>,
    #[serde(rename = "meta.value")]
    pub meta_values: Vec<String>,
    pub created: DateTime<Utc>,
}

/// A stored client-error row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEventRow {
    pub id: String,
    pub pid: String,
    pub psid: String,
    pub name: String,
    pub message: Option<String>,
    pub filename: Option<String>,
    pub pg: Option<String>,
    pub lc: Option<String>,
    pub dv: Option<String>,
    pub br: Option<String>,
    pub brv: Option<String>,
    pub os: Option<String>,
    pub osv: Option<String>,
    pub cc: Option<String>,
    pub rg: Option<String>,
    pub ct: Option<String>,
    pub created: DateTime<Utc>,
}
