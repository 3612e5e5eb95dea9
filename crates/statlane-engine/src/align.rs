//! Aligns sparse aggregate rows onto a dense axis.

use std::collections::HashMap;

use serde_json::Value;

/// One sparse result row with its decomposed time parts. The store returns
/// only the parts the query grouped by: a day-grained row has no hour, a
/// month-grained row no day, and so on.
#[derive(Debug, Clone, Default)]
pub struct SeriesRow {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub values: HashMap<String, f64>,
}

impl SeriesRow {
    /// Reconstruct the axis label for this row from whichever time parts
    /// are present. Must produce exactly the axis generator's format for
    /// the same granularity.
    pub fn label(&self) -> String {
        let month = self.month.unwrap_or(1);
        let day = self.day.unwrap_or(1);
        let hour = self.hour.unwrap_or(0);
        if let Some(minute) = self.minute {
            format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:00",
                self.year, month, day, hour, minute
            )
        } else if self.hour.is_some() {
            format!("{:04}-{:02}-{:02} {:02}:00:00", self.year, month, day, hour)
        } else if self.day.is_some() {
            format!("{:04}-{:02}-{:02}", self.year, month, day)
        } else if self.month.is_some() {
            format!("{:04}-{:02}", self.year, month)
        } else {
            format!("{:04}", self.year)
        }
    }

    /// Parse a store JSON row (decomposed time-part columns plus the
    /// requested value fields). Returns `None` when the year is missing —
    /// such a row cannot be placed on any axis.
    pub fn from_row(row: &Value, value_fields: &[&str]) -> Option<Self> {
        let year = i32::try_from(json_u64(row, "year")?).ok()?;
        let mut values = HashMap::new();
        for field in value_fields {
            values.insert((*field).to_string(), json_f64(row, field).unwrap_or(0.0));
        }
        Some(Self {
            year,
            month: json_u64(row, "month").and_then(|v| u32::try_from(v).ok()),
            day: json_u64(row, "day").and_then(|v| u32::try_from(v).ok()),
            hour: json_u64(row, "hour").and_then(|v| u32::try_from(v).ok()),
            minute: json_u64(row, "minute").and_then(|v| u32::try_from(v).ok()),
            values,
        })
    }
}

// The store's JSON output renders large numerics as strings; accept both.
fn json_u64(row: &Value, field: &str) -> Option<u64> {
    match row.get(field)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_f64(row: &Value, field: &str) -> Option<f64> {
    match row.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Map sparse rows onto `axis`, zero-filling buckets without a row.
///
/// Every requested field comes back with exactly `axis.len()` values.
/// Rows whose label is not on the axis are dropped; with matching
/// boundaries that never happens, but a mismatched store clock must not
/// panic a report.
pub fn align(
    rows: &[SeriesRow],
    axis: &[String],
    value_fields: &[&str],
) -> HashMap<String, Vec<f64>> {
    let index: HashMap<&str, usize> = axis
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect();

    let mut out: HashMap<String, Vec<f64>> = value_fields
        .iter()
        .map(|f| ((*f).to_string(), vec![0.0; axis.len()]))
        .collect();

    for row in rows {
        let Some(&bucket) = index.get(row.label().as_str()) else {
            continue;
        };
        for field in value_fields {
            if let Some(value) = row.values.get(*field) {
                if let Some(series) = out.get_mut(*field) {
                    series[bucket] += value;
                }
            }
        }
    }
    out
}

/// Like [`align`], then forward-fill: a zero bucket inherits the previous
/// bucket's value so running totals never dip back to zero between sparse
/// buckets.
pub fn align_cumulative(
    rows: &[SeriesRow],
    axis: &[String],
    value_fields: &[&str],
) -> HashMap<String, Vec<f64>> {
    let mut out = align(rows, axis, value_fields);
    for series in out.values_mut() {
        for i in 1..series.len() {
            if series[i] == 0.0 {
                series[i] = series[i - 1];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day_row(year: i32, month: u32, day: u32, pageviews: f64, visitors: f64) -> SeriesRow {
        SeriesRow {
            year,
            month: Some(month),
            day: Some(day),
            values: HashMap::from([
                ("pageviews".to_string(), pageviews),
                ("visitors".to_string(), visitors),
            ]),
            ..SeriesRow::default()
        }
    }

    fn day_axis() -> Vec<String> {
        (1..=5).map(|d| format!("2024-01-{d:02}")).collect()
    }

    #[test]
    fn rows_land_on_their_bucket_and_gaps_are_zero() {
        let rows = vec![day_row(2024, 1, 2, 10.0, 4.0), day_row(2024, 1, 5, 3.0, 1.0)];
        let aligned = align(&rows, &day_axis(), &["pageviews", "visitors"]);
        assert_eq!(
            aligned.get("pageviews"),
            Some(&vec![0.0, 10.0, 0.0, 0.0, 3.0])
        );
        assert_eq!(aligned.get("visitors"), Some(&vec![0.0, 4.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn off_axis_rows_are_dropped() {
        let rows = vec![day_row(2023, 12, 31, 99.0, 99.0), day_row(2024, 1, 1, 1.0, 1.0)];
        let aligned = align(&rows, &day_axis(), &["pageviews"]);
        assert_eq!(aligned.get("pageviews"), Some(&vec![1.0, 0.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn every_series_spans_the_whole_axis() {
        let aligned = align(&[], &day_axis(), &["pageviews", "visitors"]);
        assert_eq!(aligned.len(), 2);
        for series in aligned.values() {
            assert_eq!(series.len(), 5);
            assert!(series.iter().all(|v| *v == 0.0));
        }
    }

    #[test]
    fn cumulative_mode_forward_fills_gaps() {
        let rows = vec![day_row(2024, 1, 1, 7.0, 2.0), day_row(2024, 1, 4, 9.0, 3.0)];
        let aligned = align_cumulative(&rows, &day_axis(), &["pageviews"]);
        assert_eq!(
            aligned.get("pageviews"),
            Some(&vec![7.0, 7.0, 7.0, 9.0, 9.0])
        );
    }

    #[test]
    fn labels_match_each_granularity_format() {
        let minute = SeriesRow {
            year: 2024,
            month: Some(3),
            day: Some(7),
            hour: Some(9),
            minute: Some(5),
            ..SeriesRow::default()
        };
        assert_eq!(minute.label(), "2024-03-07 09:05:00");

        let hour = SeriesRow {
            year: 2024,
            month: Some(3),
            day: Some(7),
            hour: Some(9),
            ..SeriesRow::default()
        };
        assert_eq!(hour.label(), "2024-03-07 09:00:00");

        let month = SeriesRow {
            year: 2024,
            month: Some(3),
            ..SeriesRow::default()
        };
        assert_eq!(month.label(), "2024-03");

        let year = SeriesRow {
            year: 2024,
            ..SeriesRow::default()
        };
        assert_eq!(year.label(), "2024");
    }

    #[test]
    fn rows_parse_from_store_json() {
        let raw = serde_json::json!({
            "year": 2024,
            "month": "6",
            "day": 15,
            "pageviews": "120",
            "visitors": 48
        });
        let row = SeriesRow::from_row(&raw, &["pageviews", "visitors"]);
        let row = row.unwrap_or_default();
        assert_eq!(row.label(), "2024-06-15");
        assert_eq!(row.values.get("pageviews"), Some(&120.0));
        assert_eq!(row.values.get("visitors"), Some(&48.0));

        assert!(SeriesRow::from_row(&serde_json::json!({"day": 3}), &[]).is_none());
    }
}
