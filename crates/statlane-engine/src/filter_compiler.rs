//! Compiles filter specs into a parameterized predicate fragment.
//!
//! The one invariant everything here serves: no user-controlled string may
//! appear in generated query text. Every literal travels through the
//! [`ParamMap`] and surfaces in SQL only as a `{name:String}` placeholder
//! the store substitutes server-side.

use statlane_core::filters::FilterSpec;
use statlane_core::params::{placeholder, ParamMap};
use statlane_core::store::ANALYTICS_TABLE;

use crate::columns::{resolve_column, ColumnKind, EventScope, KvSide};
use crate::referrers::{patterns_for, RefPattern};

/// A compiled filter set. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    /// Empty, or begins with `AND (`. Safe to append after a base
    /// `WHERE pid = {pid:String} AND created BETWEEN ...` clause.
    pub predicate: String,
    pub params: ParamMap,
    /// Set when a custom-event-only column (`ev`, `ev:key*`, `ev:value`)
    /// was filtered. Callers redirect the main query to the custom-events
    /// table when this is set.
    pub used_custom_event_scope: bool,
}

/// Compile filter specs for one event scope.
///
/// Specs are grouped by column in first-appearance order; within a group
/// conditions are OR'd, groups are AND'd. Unknown columns are dropped
/// silently. Returns the compiled filter plus the specs actually applied.
///
/// `ignore_custom_event_column` suppresses the scalar `ev` condition for
/// queries already scoped to a single event name; the custom-scope flag is
/// still set.
pub fn compile(
    filters: &[FilterSpec],
    scope: EventScope,
    ignore_custom_event_column: bool,
) -> (CompiledFilter, Vec<FilterSpec>) {
    let mut groups: Vec<(String, ColumnKind, Vec<&FilterSpec>)> = Vec::new();
    for spec in filters {
        let Some(kind) = resolve_column(&spec.column, scope) else {
            continue;
        };
        match groups.iter_mut().find(|(column, _, _)| *column == spec.column) {
            Some((_, _, members)) => members.push(spec),
            None => groups.push((spec.column.clone(), kind, vec![spec])),
        }
    }

    let mut clauses: Vec<String> = Vec::new();
    let mut params = ParamMap::new();
    let mut used_custom_event_scope = false;
    let mut applied: Vec<FilterSpec> = Vec::new();

    for (group_idx, (column, kind, specs)) in groups.iter().enumerate() {
        if kind.is_custom_scope() {
            used_custom_event_scope = true;
        }
        if ignore_custom_event_column && column == "ev" {
            // The main query is already pinned to one event name; the
            // condition would be redundant but the specs still count.
            applied.extend(specs.iter().map(|s| (*s).clone()));
            continue;
        }

        let mut conditions: Vec<String> = Vec::new();
        for (spec_idx, spec) in specs.iter().copied().enumerate() {
            let param_name = format!("qf_{group_idx}_{spec_idx}");
            if let Some(condition) = build_condition(kind, spec, &param_name, &mut params) {
                conditions.push(condition);
                applied.push(spec.clone());
            }
        }
        if !conditions.is_empty() {
            clauses.push(format!("AND ({})", conditions.join(" OR ")));
        }
    }

    (
        CompiledFilter {
            predicate: clauses.join(" "),
            params,
            used_custom_event_scope,
        },
        applied,
    )
}

fn build_condition(
    kind: &ColumnKind,
    spec: &FilterSpec,
    param_name: &str,
    params: &mut ParamMap,
) -> Option<String> {
    match kind {
        ColumnKind::Scalar { column, .. } => {
            Some(scalar_condition(column, spec, param_name, params))
        }
        ColumnKind::ArrayKv {
            keys_column,
            values_column,
            side,
            ..
        } => Some(array_condition(
            keys_column,
            values_column,
            side,
            spec,
            param_name,
            params,
        )),
        ColumnKind::EntryExitPage { exit } => {
            entry_exit_condition(*exit, spec, param_name, params)
        }
        ColumnKind::ReferrerRoot => Some(referrer_condition(spec, param_name, params)),
    }
}

fn scalar_condition(
    column: &str,
    spec: &FilterSpec,
    param_name: &str,
    params: &mut ParamMap,
) -> String {
    if spec.is_null_literal() {
        let maybe_not = if spec.exclusive { "NOT " } else { "" };
        return format!("{column} IS {maybe_not}NULL");
    }
    let value = spec.value.clone().unwrap_or_default();
    params.insert(param_name, value);
    let p = placeholder(param_name);
    match (spec.contains, spec.exclusive) {
        (true, false) => format!("positionCaseInsensitive({column}, {p}) > 0"),
        (true, true) => format!("positionCaseInsensitive({column}, {p}) = 0"),
        (false, false) => format!("{column} = {p}"),
        (false, true) => format!("{column} != {p}"),
    }
}

fn array_condition(
    keys_column: &str,
    values_column: &str,
    side: &KvSide,
    spec: &FilterSpec,
    param_name: &str,
    params: &mut ParamMap,
) -> String {
    match side {
        KvSide::Key | KvSide::Value => {
            let column = match side {
                KvSide::Key => keys_column,
                _ => values_column,
            };
            if spec.is_null_literal() {
                // Arrays are never NULL in the fixed schema; the nearest
                // meaning of a null literal is "no pairs at all".
                return if spec.exclusive {
                    format!("notEmpty({column})")
                } else {
                    format!("empty({column})")
                };
            }
            let value = spec.value.clone().unwrap_or_default();
            params.insert(param_name, value);
            let p = placeholder(param_name);
            // Presence test; `exclusive` inverts it into an absence test.
            let core = if spec.contains {
                format!("arrayExists(x -> positionCaseInsensitive(x, {p}) > 0, {column})")
            } else {
                format!("has({column}, {p})")
            };
            if spec.exclusive {
                format!("NOT {core}")
            } else {
                core
            }
        }
        KvSide::ValueForKey(key) => {
            let key_param = format!("{param_name}_key");
            params.insert(&key_param, key.clone());
            let pk = placeholder(&key_param);
            if spec.is_null_literal() {
                // "Key has no value" is simply "key absent".
                return if spec.exclusive {
                    format!("indexOf({keys_column}, {pk}) > 0")
                } else {
                    format!("indexOf({keys_column}, {pk}) = 0")
                };
            }
            let value = spec.value.clone().unwrap_or_default();
            params.insert(param_name, value);
            let p = placeholder(param_name);
            let element = format!("{values_column}[indexOf({keys_column}, {pk})]");
            match (spec.contains, spec.exclusive) {
                (true, false) => format!("positionCaseInsensitive({element}, {p}) > 0"),
                (true, true) => format!("positionCaseInsensitive({element}, {p}) = 0"),
                (false, false) => format!("{element} = {p}"),
                (false, true) => format!("{element} != {p}"),
            }
        }
    }
}

/// Correlated-subquery membership test on the first/last page per session.
/// The subquery reuses the `{pid:String}` param every report query binds.
fn entry_exit_condition(
    exit: bool,
    spec: &FilterSpec,
    param_name: &str,
    params: &mut ParamMap,
) -> Option<String> {
    // A null entry/exit page has no meaning; drop the spec.
    if spec.is_null_literal() {
        return None;
    }
    let value = spec.value.clone().unwrap_or_default();
    params.insert(param_name, value);
    let p = placeholder(param_name);

    let (agg, alias) = if exit {
        ("argMax", "exit_pg")
    } else {
        ("argMin", "entry_pg")
    };
    let membership = if spec.exclusive { "NOT IN" } else { "IN" };
    let page_test = if spec.contains {
        format!("positionCaseInsensitive({alias}, {p}) > 0")
    } else {
        format!("{alias} = {p}")
    };

    Some(format!(
        "psid {membership} (SELECT psid FROM (SELECT psid, {agg}(pg, created) AS {alias} \
         FROM {ANALYTICS_TABLE} WHERE pid = {{pid:String}} AND psid IS NOT NULL \
         GROUP BY psid) WHERE {page_test})"
    ))
}

/// Canonical referrer root: the literal names a source ("Google"), which
/// expands to OR'd pattern tests. The patterns are static table data but
/// are parameterized anyway so no test has to reason about two cases.
fn referrer_condition(spec: &FilterSpec, param_name: &str, params: &mut ParamMap) -> String {
    if spec.is_null_literal() {
        let maybe_not = if spec.exclusive { "NOT " } else { "" };
        return format!("ref IS {maybe_not}NULL");
    }
    let value = spec.value.clone().unwrap_or_default();

    let patterns = patterns_for(&value);
    let mut tests: Vec<String> = Vec::new();
    if patterns.is_empty() {
        // Unknown root name: match the literal itself as a domain.
        params.insert(param_name, value);
        tests.push(domain_test(&placeholder(param_name)));
    } else {
        for (idx, pattern) in patterns.iter().enumerate() {
            let pattern_param = format!("{param_name}_r{idx}");
            match pattern {
                RefPattern::SchemePrefix(prefix) => {
                    params.insert(&pattern_param, *prefix);
                    tests.push(format!("startsWith(ref, {})", placeholder(&pattern_param)));
                }
                RefPattern::Domain(domain) => {
                    params.insert(&pattern_param, *domain);
                    tests.push(domain_test(&placeholder(&pattern_param)));
                }
            }
        }
    }

    let joined = tests.join(" OR ");
    if spec.exclusive {
        format!("NOT ({joined})")
    } else {
        format!("({joined})")
    }
}

fn domain_test(p: &str) -> String {
    format!("(ref = {p} OR endsWith(ref, concat('.', {p})))")
}
