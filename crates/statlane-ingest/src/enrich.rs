//! Payload enrichment: UA parsing, GeoIP, stored-row construction.

use chrono::{DateTime, Utc};

use statlane_core::event::{CustomEventRow, ErrorEventRow, PageviewRow, TrackPayload};
use statlane_core::store::{ANALYTICS_TABLE, CUSTOM_EVENTS_TABLE, ERRORS_TABLE};

/// Parsed User-Agent fields.
#[derive(Debug, Clone, Default)]
pub struct UaInfo {
    pub br: Option<String>,
    pub brv: Option<String>,
    pub os: Option<String>,
    pub osv: Option<String>,
    pub dv: Option<String>,
}

/// GeoIP fields resolved from the client IP.
#[derive(Debug, Clone, Default)]
pub struct GeoInfo {
    pub cc: Option<String>,
    pub rg: Option<String>,
    pub ct: Option<String>,
}

/// Parse a User-Agent string via `woothee`.
///
/// Returns empty info (not an error) when the UA cannot be classified —
/// the event is still stored, just without device columns.
pub fn parse_user_agent(user_agent: &str) -> UaInfo {
    let Some(result) = woothee::parser::Parser::new().parse(user_agent) else {
        return UaInfo::default();
    };

    // woothee categories map onto the dv column convention:
    //   "pc" → desktop, phones → mobile, "tablet" → tablet.
    let dv = match result.category {
        "smartphone" | "mobilephone" => "mobile",
        "tablet" => "tablet",
        _ => "desktop",
    };

    UaInfo {
        br: non_empty(result.name),
        brv: non_empty(&result.version),
        os: non_empty(result.os),
        osv: non_empty(&result.os_version),
        dv: Some(dv.to_string()),
    }
}

fn non_empty(value: &str) -> Option<String> {
    // woothee reports unknown fields as "UNKNOWN" or ""; both become NULL.
    if value.is_empty() || value == "UNKNOWN" {
        None
    } else {
        Some(value.to_string())
    }
}

/// GeoIP lookup against the MaxMind database at `path`.
///
/// Returns empty info when the database file is absent or the IP cannot
/// be parsed; geo columns stay NULL rather than failing ingestion.
pub fn lookup_geo(path: &str, ip: &str) -> GeoInfo {
    try_lookup_geo(path, ip).unwrap_or_default()
}

fn try_lookup_geo(path: &str, ip: &str) -> Option<GeoInfo> {
    use std::net::IpAddr;
    use std::str::FromStr;

    if !std::path::Path::new(path).exists() {
        return None;
    }
    let reader = maxminddb::Reader::open_readfile(path).ok()?;
    let ip_addr = IpAddr::from_str(ip).ok()?;
    let record: maxminddb::geoip2::City = reader.lookup(ip_addr).ok()?;

    Some(GeoInfo {
        cc: record
            .country
            .as_ref()
            .and_then(|c| c.iso_code)
            .map(|s| s.to_string()),
        rg: record
            .subdivisions
            .as_ref()
            .and_then(|subs| subs.first())
            .and_then(|sub| sub.names.as_ref())
            .and_then(|names| names.get("en"))
            .map(|s| s.to_string()),
        ct: record
            .city
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|names| names.get("en"))
            .map(|s| s.to_string()),
    })
}

/// Flatten a wire metadata object into parallel key/value arrays.
/// Non-string scalars are stringified; nested values are skipped.
pub fn metadata_arrays(value: Option<&serde_json::Value>) -> (Vec<String>, Vec<String>) {
    let mut keys = Vec::new();
    let mut values = Vec::new();
    if let Some(obj) = value.and_then(|v| v.as_object()) {
        for (key, val) in obj {
            let rendered = match val {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            keys.push(key.clone());
            values.push(rendered);
        }
    }
    (keys, values)
}

/// A fully enriched event ready for storage.
#[derive(Debug, Clone)]
pub enum StoredRow {
    Pageview(Box<PageviewRow>),
    Custom(Box<CustomEventRow>),
    Error(Box<ErrorEventRow>),
}

impl StoredRow {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Pageview(_) => ANALYTICS_TABLE,
            Self::Custom(_) => CUSTOM_EVENTS_TABLE,
            Self::Error(_) => ERRORS_TABLE,
        }
    }

    pub fn into_value(self) -> anyhow::Result<serde_json::Value> {
        let value = match self {
            Self::Pageview(row) => serde_json::to_value(*row)?,
            Self::Custom(row) => serde_json::to_value(*row)?,
            Self::Error(row) => serde_json::to_value(*row)?,
        };
        Ok(value)
    }
}

/// Builds stored rows from screened payloads.
pub struct Enricher {
    geoip_path: String,
}

impl Enricher {
    pub fn new(geoip_path: &str) -> Self {
        Self {
            geoip_path: geoip_path.to_string(),
        }
    }

    /// Assemble the stored row for an accepted payload. The raw IP and
    /// user agent feed UA/geo columns and are then discarded — only the
    /// derived identities are stored.
    #[allow(clippy::too_many_arguments)]
    pub fn build_row(
        &self,
        payload: &TrackPayload,
        ip: &str,
        user_agent: &str,
        psid: &str,
        profile: Option<String>,
        unique: bool,
        created: DateTime<Utc>,
    ) -> StoredRow {
        let ua = parse_user_agent(user_agent);
        let geo = lookup_geo(&self.geoip_path, ip);
        let id = uuid::Uuid::new_v4().to_string();

        match payload.event_type.as_str() {
            "custom" => {
                let (meta_keys, meta_values) = metadata_arrays(payload.meta.as_ref());
                StoredRow::Custom(Box::new(CustomEventRow {
                    id,
                    pid: payload.pid.clone(),
                    psid: psid.to_string(),
                    profile,
                    ev: payload.ev.clone().unwrap_or_default(),
                    pg: payload.pg.clone(),
                    referrer: payload.referrer.clone(),
                    so: payload.so.clone(),
                    me: payload.me.clone(),
                    ca: payload.ca.clone(),
                    te: payload.te.clone(),
                    co: payload.co.clone(),
                    lc: payload.lc.clone(),
                    dv: ua.dv,
                    br: ua.br,
                    brv: ua.brv,
                    os: ua.os,
                    osv: ua.osv,
                    cc: geo.cc,
                    rg: geo.rg,
                    ct: geo.ct,
                    meta_keys,
                    meta_values,
                    created,
                }))
            }
            "error" => StoredRow::Error(Box::new(ErrorEventRow {
                id,
                pid: payload.pid.clone(),
                psid: psid.to_string(),
                name: payload.name.clone().unwrap_or_default(),
                message: payload.message.clone(),
                filename: payload.filename.clone(),
                pg: payload.pg.clone(),
                lc: payload.lc.clone(),
                dv: ua.dv,
                br: ua.br,
                brv: ua.brv,
                os: ua.os,
                osv: ua.osv,
                cc: geo.cc,
                rg: geo.rg,
                ct: geo.ct,
                created,
            })),
            _ => {
                let (tag_keys, tag_values) = metadata_arrays(payload.tags.as_ref());
                StoredRow::Pageview(Box::new(PageviewRow {
                    id,
                    pid: payload.pid.clone(),
                    psid: psid.to_string(),
                    profile,
                    pg: payload.pg.clone(),
                    prev: payload.prev.clone(),
                    referrer: payload.referrer.clone(),
                    so: payload.so.clone(),
                    me: payload.me.clone(),
                    ca: payload.ca.clone(),
                    te: payload.te.clone(),
                    co: payload.co.clone(),
                    lc: payload.lc.clone(),
                    dv: ua.dv,
                    br: ua.br,
                    brv: ua.brv,
                    os: ua.os,
                    osv: ua.osv,
                    cc: geo.cc,
                    rg: geo.rg,
                    ct: geo.ct,
                    tag_keys,
                    tag_values,
                    unique,
                    created,
                }))
            }
        }
    }
}
