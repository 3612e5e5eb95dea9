//! Ingestion request screening.

use std::fmt;

use statlane_core::config::Config;
use statlane_core::event::TrackPayload;

/// Decision for one track request. Callers pattern-match instead of
/// catching anything: `Ignored` requests are still answered with a plain
/// success so crawlers don't learn they were detected, `Rejected` ones
/// map to a validation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Ignored(IgnoreReason),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BotUserAgent,
    EmptyUserAgent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnknownEventType(String),
    MissingEventName,
    MissingErrorName,
    TooManyMetadataPairs(usize),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BotUserAgent => write!(f, "bot user agent"),
            Self::EmptyUserAgent => write!(f, "empty user agent"),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEventType(t) => write!(f, "unknown event type {t:?}"),
            Self::MissingEventName => write!(f, "custom events require an event name"),
            Self::MissingErrorName => write!(f, "error events require a name"),
            Self::TooManyMetadataPairs(n) => write!(f, "too many metadata pairs ({n})"),
        }
    }
}

/// Classify a track request before any identity work happens.
pub fn screen(payload: &TrackPayload, user_agent: &str, config: &Config) -> Outcome {
    if user_agent.trim().is_empty() {
        return Outcome::Ignored(IgnoreReason::EmptyUserAgent);
    }
    if is_bot(user_agent) {
        return Outcome::Ignored(IgnoreReason::BotUserAgent);
    }

    match payload.event_type.as_str() {
        "pageview" => {}
        "custom" => {
            if payload.ev.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Outcome::Rejected(RejectReason::MissingEventName);
            }
        }
        "error" => {
            if payload.name.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Outcome::Rejected(RejectReason::MissingErrorName);
            }
        }
        other => return Outcome::Rejected(RejectReason::UnknownEventType(other.to_string())),
    }

    let pairs = object_len(payload.meta.as_ref()) + object_len(payload.tags.as_ref());
    if pairs > config.max_metadata_pairs {
        return Outcome::Rejected(RejectReason::TooManyMetadataPairs(pairs));
    }

    Outcome::Accepted
}

fn is_bot(user_agent: &str) -> bool {
    woothee::parser::Parser::new()
        .parse(user_agent)
        .map(|result| result.category == "crawler")
        .unwrap_or(false)
}

fn object_len(value: Option<&serde_json::Value>) -> usize {
    value
        .and_then(|v| v.as_object())
        .map(|obj| obj.len())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSER_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const BOT_UA: &str = "Googlebot/2.1 (+http://www.google.com/bot.html)";

    fn pageview() -> TrackPayload {
        TrackPayload {
            pid: "proj1".to_string(),
            event_type: "pageview".to_string(),
            pg: Some("/".to_string()),
            prev: None,
            referrer: None,
            lc: None,
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

    #[test]
    fn browsers_are_accepted() {
        assert_eq!(
            screen(&pageview(), BROWSER_UA, &Config::default()),
            Outcome::Accepted
        );
    }

    #[test]
    fn crawlers_are_silently_ignored() {
        assert_eq!(
            screen(&pageview(), BOT_UA, &Config::default()),
            Outcome::Ignored(IgnoreReason::BotUserAgent)
        );
        assert_eq!(
            screen(&pageview(), "  ", &Config::default()),
            Outcome::Ignored(IgnoreReason::EmptyUserAgent)
        );
    }

    #[test]
    fn unknown_event_types_are_rejected() {
        let mut payload = pageview();
        payload.event_type = "heartbeat".to_string();
        assert!(matches!(
            screen(&payload, BROWSER_UA, &Config::default()),
            Outcome::Rejected(RejectReason::UnknownEventType(_))
        ));
    }

    #[test]
    fn custom_events_need_a_name() {
        let mut payload = pageview();
        payload.event_type = "custom".to_string();
        assert_eq!(
            screen(&payload, BROWSER_UA, &Config::default()),
            Outcome::Rejected(RejectReason::MissingEventName)
        );
        payload.ev = Some("signup".to_string());
        assert_eq!(
            screen(&payload, BROWSER_UA, &Config::default()),
            Outcome::Accepted
        );
    }

    #[test]
    fn oversized_metadata_is_rejected() {
        let mut payload = pageview();
        payload.event_type = "custom".to_string();
        payload.ev = Some("signup".to_string());
        let mut obj = serde_json::Map::new();
        for i in 0..40 {
            obj.insert(format!("k{i}"), serde_json::json!("v"));
        }
        payload.meta = Some(serde_json::Value::Object(obj));
        assert!(matches!(
            screen(&payload, BROWSER_UA, &Config::default()),
            Outcome::Rejected(RejectReason::TooManyMetadataPairs(40))
        ));
    }
}
