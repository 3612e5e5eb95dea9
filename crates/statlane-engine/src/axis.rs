//! Dense time-axis generation.

use chrono::{Duration, Months, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use statlane_core::error::EngineResult;
use statlane_core::granularity::Granularity;

use crate::time_buckets::{is_zero_offset, parse_timezone, start_of_unit};

/// The canonical, gap-free sequence of bucket labels for one range.
///
/// `local` drives display; `utc` lines up with store predicates. Both are
/// strictly increasing with a spacing of exactly one granularity unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Axis {
    pub utc: Vec<String>,
    pub local: Vec<String>,
}

impl Axis {
    pub fn len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }
}

/// Generate the axis between two timezone-local boundaries, inclusive.
///
/// Pure function of its inputs: re-running with the same arguments yields
/// an identical axis.
pub fn generate(
    granularity: Granularity,
    from_local: NaiveDateTime,
    to_local: NaiveDateTime,
    timezone: &str,
) -> EngineResult<Axis> {
    let tz = parse_timezone(timezone)?;
    let zero_offset = is_zero_offset(timezone.trim());
    let format = granularity.label_format();

    let mut utc = Vec::new();
    let mut local = Vec::new();
    let mut current = start_of_unit(from_local, granularity);
    while current <= to_local {
        local.push(current.format(format).to_string());
        if zero_offset {
            utc.push(current.format(format).to_string());
        } else {
            utc.push(to_utc_wall_time(tz, current).format(format).to_string());
        }
        match step(current, granularity) {
            Some(next) => current = next,
            None => break,
        }
    }

    Ok(Axis { utc, local })
}

/// Shift a local bucket start to its UTC wall time. An ambiguous local
/// time resolves to the earlier instant; a nonexistent one (DST gap)
/// keeps the local wall time so the axis never loses a bucket.
fn to_utc_wall_time(tz: Tz, local: NaiveDateTime) -> NaiveDateTime {
    match tz.from_local_datetime(&local) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc).naive_utc(),
        chrono::LocalResult::Ambiguous(a, b) => a.min(b).with_timezone(&Utc).naive_utc(),
        chrono::LocalResult::None => local,
    }
}

fn step(current: NaiveDateTime, granularity: Granularity) -> Option<NaiveDateTime> {
    match granularity {
        Granularity::Minute => current.checked_add_signed(Duration::minutes(1)),
        Granularity::Hour => current.checked_add_signed(Duration::hours(1)),
        Granularity::Day => current.checked_add_signed(Duration::days(1)),
        Granularity::Month => current.checked_add_months(Months::new(1)),
        Granularity::Year => current.checked_add_months(Months::new(12)),
    }
}
