use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// One column filter, already expanded from the wire form.
///
/// Multiple specs sharing a column are OR'd together by the compiler;
/// specs across distinct columns are AND'd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub column: String,
    /// `None` compiles to an `IS [NOT] NULL` test, as does the literal
    /// string "null" (case-insensitive).
    pub value: Option<String>,
    pub exclusive: bool,
    pub contains: bool,
}

impl FilterSpec {
    pub fn new(column: &str, value: &str) -> Self {
        Self {
            column: column.to_string(),
            value: Some(value.to_string()),
            exclusive: false,
            contains: false,
        }
    }

    /// True when this spec should compile to a NULL test instead of equality.
    pub fn is_null_literal(&self) -> bool {
        match &self.value {
            None => true,
            Some(v) => v.eq_ignore_ascii_case("null"),
        }
    }
}

/// Wire shape: `{column, filter, isExclusive?, isContains?}` where `filter`
/// may be a scalar or an array (arrays expand to one spec per element).
#[derive(Debug, Deserialize)]
struct WireFilter {
    column: String,
    filter: Value,
    #[serde(default, rename = "isExclusive")]
    is_exclusive: bool,
    #[serde(default, rename = "isContains")]
    is_contains: bool,
}

/// Parse the filter query parameter.
///
/// Malformed JSON is treated as "no filters" so one broken filter never
/// fails the whole report. Valid JSON that is not an array is a caller
/// mistake and is rejected.
pub fn parse_filters(raw: &str) -> EngineResult<Vec<FilterSpec>> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return Ok(Vec::new()),
    };
    filters_from_value(&value)
}

/// Expand an already-parsed JSON value into filter specs.
pub fn filters_from_value(value: &Value) -> EngineResult<Vec<FilterSpec>> {
    let items = value
        .as_array()
        .ok_or_else(|| EngineError::BadRequest("filters must be a JSON array".to_string()))?;

    let mut specs = Vec::new();
    for item in items {
        // Individual malformed entries are skipped, not fatal.
        let Ok(wire) = serde_json::from_value::<WireFilter>(item.clone()) else {
            continue;
        };
        match &wire.filter {
            Value::Array(values) => {
                for v in values {
                    specs.push(FilterSpec {
                        column: wire.column.clone(),
                        value: scalar_to_string(v),
                        exclusive: wire.is_exclusive,
                        contains: wire.is_contains,
                    });
                }
            }
            scalar => specs.push(FilterSpec {
                column: wire.column.clone(),
                value: scalar_to_string(scalar),
                exclusive: wire.is_exclusive,
                contains: wire.is_contains,
            }),
        }
    }
    Ok(specs)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // Nested arrays/objects are not valid filter literals; treat as null.
        _ => None,
    }
}
