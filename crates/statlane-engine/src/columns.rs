//! Column whitelists and filter-column dispatch.

/// Which event table a report targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    Pageviews,
    CustomEvents,
    Errors,
    Performance,
}

const PAGEVIEW_COLUMNS: &[&str] = &[
    "pg", "lc", "ref", "so", "me", "ca", "te", "co", "dv", "br", "brv", "os", "osv", "cc", "rg",
    "ct",
];

const ERROR_COLUMNS: &[&str] = &[
    "pg", "lc", "dv", "br", "brv", "os", "osv", "cc", "rg", "ct", "name", "message", "filename",
];

const PERFORMANCE_COLUMNS: &[&str] = &["pg", "dv", "br", "cc", "rg", "ct"];

fn scalar_whitelist(scope: EventScope) -> &'static [&'static str] {
    match scope {
        EventScope::Pageviews | EventScope::CustomEvents => PAGEVIEW_COLUMNS,
        EventScope::Errors => ERROR_COLUMNS,
        EventScope::Performance => PERFORMANCE_COLUMNS,
    }
}

/// Which half of a key/value metadata pair a filter addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KvSide {
    Key,
    Value,
    /// Match the value stored under a specific key. The key is
    /// user-controlled and must be parameterized like any literal.
    ValueForKey(String),
}

/// Closed set of filterable column shapes, resolved once per column
/// before any predicate is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ColumnKind {
    Scalar {
        column: String,
        custom_scope: bool,
    },
    ArrayKv {
        keys_column: &'static str,
        values_column: &'static str,
        side: KvSide,
        custom_scope: bool,
    },
    EntryExitPage {
        exit: bool,
    },
    ReferrerRoot,
}

impl ColumnKind {
    pub(crate) fn is_custom_scope(&self) -> bool {
        match self {
            ColumnKind::Scalar { custom_scope, .. } => *custom_scope,
            ColumnKind::ArrayKv { custom_scope, .. } => *custom_scope,
            _ => false,
        }
    }
}

/// Resolve a wire column name to its kind, or `None` for unknown columns
/// (which are silently dropped, never rejected).
pub(crate) fn resolve_column(column: &str, scope: EventScope) -> Option<ColumnKind> {
    let session_based = matches!(scope, EventScope::Pageviews | EventScope::CustomEvents);

    match column {
        "entryPage" if session_based => Some(ColumnKind::EntryExitPage { exit: false }),
        "exitPage" if session_based => Some(ColumnKind::EntryExitPage { exit: true }),
        "refn" if session_based => Some(ColumnKind::ReferrerRoot),
        // Custom-event columns are recognized for any session-based scope;
        // filtering them redirects the main query to the custom-events table.
        "ev" if session_based => Some(ColumnKind::Scalar {
            column: "ev".to_string(),
            custom_scope: true,
        }),
        "ev:key" if session_based => Some(kv("meta.key", "meta.value", KvSide::Key, true)),
        "ev:value" if session_based => Some(kv("meta.key", "meta.value", KvSide::Value, true)),
        "tag:key" if session_based => Some(kv("tags.key", "tags.value", KvSide::Key, false)),
        "tag:value" if session_based => Some(kv("tags.key", "tags.value", KvSide::Value, false)),
        _ => {
            if session_based {
                if let Some(key) = column.strip_prefix("ev:key:") {
                    return Some(kv(
                        "meta.key",
                        "meta.value",
                        KvSide::ValueForKey(key.to_string()),
                        true,
                    ));
                }
                if let Some(key) = column.strip_prefix("tag:key:") {
                    return Some(kv(
                        "tags.key",
                        "tags.value",
                        KvSide::ValueForKey(key.to_string()),
                        false,
                    ));
                }
            }
            if scalar_whitelist(scope).contains(&column) {
                Some(ColumnKind::Scalar {
                    column: column.to_string(),
                    custom_scope: false,
                })
            } else {
                None
            }
        }
    }
}

fn kv(
    keys_column: &'static str,
    values_column: &'static str,
    side: KvSide,
    custom_scope: bool,
) -> ColumnKind {
    ColumnKind::ArrayKv {
        keys_column,
        values_column,
        side,
        custom_scope,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelisted_scalars_resolve_per_scope() {
        assert!(resolve_column("cc", EventScope::Pageviews).is_some());
        assert!(resolve_column("name", EventScope::Errors).is_some());
        assert!(resolve_column("name", EventScope::Pageviews).is_none());
        assert!(resolve_column("so", EventScope::Performance).is_none());
    }

    #[test]
    fn unknown_columns_resolve_to_none() {
        assert!(resolve_column("password", EventScope::Pageviews).is_none());
        assert!(resolve_column("", EventScope::Pageviews).is_none());
    }

    #[test]
    fn keyed_metadata_columns_carry_their_key() {
        let kind = resolve_column("ev:key:plan", EventScope::CustomEvents);
        match kind {
            Some(ColumnKind::ArrayKv {
                side: KvSide::ValueForKey(key),
                custom_scope,
                ..
            }) => {
                assert_eq!(key, "plan");
                assert!(custom_scope);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn virtual_columns_are_session_scoped() {
        assert!(resolve_column("entryPage", EventScope::Pageviews).is_some());
        assert!(resolve_column("entryPage", EventScope::Errors).is_none());
        assert!(resolve_column("refn", EventScope::Performance).is_none());
    }

    #[test]
    fn custom_event_columns_flag_scope() {
        for column in ["ev", "ev:key", "ev:value", "ev:key:plan"] {
            let kind = resolve_column(column, EventScope::Pageviews);
            assert!(
                kind.as_ref().is_some_and(ColumnKind::is_custom_scope),
                "{column} should resolve with custom scope"
            );
        }
        let kind = resolve_column("tag:key", EventScope::Pageviews);
        assert!(kind.is_some_and(|k| !k.is_custom_scope()));
    }
}
