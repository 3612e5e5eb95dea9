#[derive(Debug, Clone)]
pub struct Config {
    /// Sliding session window in seconds. A session ends after this long
    /// without a pageview.
    pub session_ttl_seconds: u64,
    pub funnel_min_steps: usize,
    pub funnel_max_steps: usize,
    /// Maximum number of metadata key/value pairs accepted per event.
    pub max_metadata_pairs: usize,
    pub geoip_path: String,
}

pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 1800;
pub const DEFAULT_FUNNEL_MIN_STEPS: usize = 2;
pub const DEFAULT_FUNNEL_MAX_STEPS: usize = 10;
pub const DEFAULT_MAX_METADATA_PAIRS: usize = 30;

impl Default for Config {
    fn default() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            funnel_min_steps: DEFAULT_FUNNEL_MIN_STEPS,
            funnel_max_steps: DEFAULT_FUNNEL_MAX_STEPS,
            max_metadata_pairs: DEFAULT_MAX_METADATA_PAIRS,
            geoip_path: "./GeoLite2-City.mmdb".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            session_ttl_seconds: std::env::var("STATLANE_SESSION_TTL")
                .unwrap_or_else(|_| DEFAULT_SESSION_TTL_SECONDS.to_string())
                .parse()
                .map_err(|e| format!("invalid STATLANE_SESSION_TTL: {e}"))?,
            funnel_min_steps: std::env::var("STATLANE_FUNNEL_MIN_STEPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_FUNNEL_MIN_STEPS),
            funnel_max_steps: std::env::var("STATLANE_FUNNEL_MAX_STEPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_FUNNEL_MAX_STEPS),
            max_metadata_pairs: std::env::var("STATLANE_MAX_METADATA_PAIRS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_METADATA_PAIRS),
            geoip_path: std::env::var("STATLANE_GEOIP_PATH")
                .unwrap_or_else(|_| "./GeoLite2-City.mmdb".to_string()),
        })
    }
}
