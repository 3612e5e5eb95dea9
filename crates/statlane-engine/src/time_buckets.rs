//! Granularity planning and time-range resolution.

use chrono::{DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, NaiveDateTime,
    TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use statlane_core::error::{EngineError, EngineResult};
use statlane_core::granularity::{Granularity, Period};

/// Timezone names with a permanent zero UTC offset. Conversion is skipped
/// for these so the output stays byte-stable regardless of how the tz
/// library models them.
pub const ZERO_OFFSET_TIMEZONES: &[&str] = &[
    "UTC",
    "GMT",
    "Etc/UTC",
    "Etc/GMT",
    "Etc/Greenwich",
    "Greenwich",
    "Iceland",
    "Atlantic/Reykjavik",
    "Africa/Abidjan",
    "Africa/Accra",
    "Africa/Monrovia",
];

/// Upper bound of the legality table. Day-diffs beyond this fall back to
/// Year granularity; see [`resolve`].
const MAX_SPAN_DAYS: i64 = 99_999;

/// Granularities legal for a range spanning `span_days` whole days
/// (`from == to` is a zero-day span).
pub fn legal_granularities(span_days: i64) -> &'static [Granularity] {
    use Granularity::*;
    match span_days {
        d if d <= 0 => &[Minute, Hour],
        d if d <= 7 => &[Hour, Day, Month],
        d if d <= 28 => &[Day, Month],
        d if d <= 366 => &[Day, Month],
        d if d <= 732 => &[Month],
        d if d <= 1464 => &[Month, Year],
        _ => &[Year],
    }
}

/// Default granularity for named periods. Always a member of
/// [`legal_granularities`] for the same span.
pub fn default_granularity(span_days: i64) -> Granularity {
    match span_days {
        d if d <= 1 => Granularity::Hour,
        d if d <= 366 => Granularity::Day,
        d if d <= 1464 => Granularity::Month,
        _ => Granularity::Year,
    }
}

/// A reporting time-range request as received from the caller.
#[derive(Debug, Clone, Default)]
pub struct TimeRangeRequest {
    pub period: Option<Period>,
    /// "YYYY-MM-DD"; required together with `to` for explicit ranges.
    pub from: Option<String>,
    pub to: Option<String>,
    pub granularity: Option<Granularity>,
    pub timezone: String,
    /// Days since the project's earliest event; required for period "all".
    pub all_time_diff_days: Option<i64>,
}

/// Resolved absolute boundaries. `*_utc` feed the store predicate,
/// `*_local` feed axis generation and display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub granularity: Granularity,
    pub from_utc: NaiveDateTime,
    pub to_utc: NaiveDateTime,
    pub from_local: NaiveDateTime,
    pub to_local: NaiveDateTime,
}

impl TimeRange {
    pub fn from_utc_str(&self) -> String {
        fmt_ts(self.from_utc)
    }

    pub fn to_utc_str(&self) -> String {
        fmt_ts(self.to_utc)
    }

    pub fn from_local_str(&self) -> String {
        fmt_ts(self.from_local)
    }

    pub fn to_local_str(&self) -> String {
        fmt_ts(self.to_local)
    }
}

pub(crate) fn fmt_ts(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(crate) fn is_zero_offset(timezone: &str) -> bool {
    ZERO_OFFSET_TIMEZONES.contains(&timezone)
}

pub(crate) fn parse_timezone(timezone: &str) -> EngineResult<Tz> {
    let trimmed = timezone.trim();
    if trimmed.is_empty() {
        return Err(EngineError::BadRequest("timezone must not be empty".to_string()));
    }
    trimmed
        .parse::<Tz>()
        .map_err(|_| EngineError::BadRequest(format!("invalid timezone {trimmed:?}")))
}

/// Resolve a time-range request against `now_utc`.
///
/// `now_utc` is an argument (not read from the clock) so planning is
/// deterministic and testable.
pub fn resolve(req: &TimeRangeRequest, now_utc: DateTime<Utc>) -> EngineResult<TimeRange> {
    let tz = parse_timezone(&req.timezone)?;
    let zero_offset = is_zero_offset(req.timezone.trim());

    if req.from.is_some() || req.to.is_some() {
        return resolve_explicit(req, tz, zero_offset);
    }
    match req.period {
        Some(Period::Custom) | None => Err(EngineError::BadRequest(
            "missing time range: provide a period or from/to dates".to_string(),
        )),
        Some(period) => resolve_period(req, period, tz, zero_offset, now_utc),
    }
}

fn resolve_explicit(req: &TimeRangeRequest, tz: Tz, zero_offset: bool) -> EngineResult<TimeRange> {
    let (Some(from_raw), Some(to_raw)) = (&req.from, &req.to) else {
        return Err(EngineError::BadRequest(
            "both from and to are required for an explicit range".to_string(),
        ));
    };
    let from_date = parse_date(from_raw)?;
    let to_date = parse_date(to_raw)?;
    if from_date > to_date {
        return Err(EngineError::BadRequest(
            "from must be on or before to".to_string(),
        ));
    }

    let span_days = (to_date - from_date).num_days();
    let granularity = req
        .granularity
        .unwrap_or_else(|| default_granularity(span_days));
    ensure_legal(granularity, span_days)?;

    let (from_local, to_local) = if from_date == to_date {
        // A single calendar day in the caller's timezone, whole-day bounds.
        (day_start(from_date), day_end(from_date))
    } else {
        (
            start_of_unit(day_start(from_date), granularity),
            end_of_unit(to_date, granularity),
        )
    };

    finish(granularity, from_local, to_local, tz, zero_offset)
}

fn resolve_period(
    req: &TimeRangeRequest,
    period: Period,
    tz: Tz,
    zero_offset: bool,
    now_utc: DateTime<Utc>,
) -> EngineResult<TimeRange> {
    let now_local = if zero_offset {
        now_utc.naive_utc()
    } else {
        now_utc.with_timezone(&tz).naive_local()
    };
    let today = now_local.date();

    let mut forced_granularity: Option<Granularity> = None;
    let (from_local, to_local) = match period {
        Period::Today => (day_start(today), now_local),
        Period::Yesterday => {
            let yesterday = today - Duration::days(1);
            (day_start(yesterday), day_end(yesterday))
        }
        Period::LastHour => (now_local - Duration::hours(1), now_local),
        Period::LastDay => (now_local - Duration::days(1), now_local),
        Period::LastSevenDays => (now_local - Duration::days(7), now_local),
        Period::LastFourWeeks => (now_local - Duration::days(28), now_local),
        Period::LastThreeMonths => (sub_months(now_local, 3), now_local),
        Period::LastTwelveMonths => (sub_months(now_local, 12), now_local),
        Period::LastTwentyFourMonths => (sub_months(now_local, 24), now_local),
        Period::All => {
            let diff = req.all_time_diff_days.ok_or_else(|| {
                EngineError::BadRequest(
                    "period \"all\" requires the project's first-event day distance".to_string(),
                )
            })?;
            if diff > MAX_SPAN_DAYS {
                // Beyond the legality table. Unreachable with real data;
                // keep reporting alive on Year buckets rather than erroring.
                tracing::warn!(diff, "all-time span exceeds the granularity table, using year buckets");
                forced_granularity = Some(Granularity::Year);
            }
            let days_back = if diff <= 1 { 1 } else { diff - 1 };
            (now_local - Duration::days(days_back), now_local)
        }
        Period::Custom => {
            return Err(EngineError::BadRequest(
                "period \"custom\" requires from/to dates".to_string(),
            ))
        }
    };

    let span_days = (to_local.date() - from_local.date()).num_days();
    let granularity = match forced_granularity {
        Some(g) => g,
        None => {
            let g = req
                .granularity
                .unwrap_or_else(|| default_granularity(span_days));
            ensure_legal(g, span_days)?;
            g
        }
    };

    finish(
        granularity,
        start_of_unit(from_local, granularity),
        to_local,
        tz,
        zero_offset,
    )
}

fn finish(
    granularity: Granularity,
    from_local: NaiveDateTime,
    to_local: NaiveDateTime,
    tz: Tz,
    zero_offset: bool,
) -> EngineResult<TimeRange> {
    let (from_utc, to_utc) = if zero_offset {
        (from_local, to_local)
    } else {
        (local_to_utc(tz, from_local)?, local_to_utc(tz, to_local)?)
    };
    if from_utc > to_utc {
        return Err(EngineError::BadRequest(
            "from must be on or before to".to_string(),
        ));
    }
    Ok(TimeRange {
        granularity,
        from_utc,
        to_utc,
        from_local,
        to_local,
    })
}

fn ensure_legal(granularity: Granularity, span_days: i64) -> EngineResult<()> {
    let legal = legal_granularities(span_days);
    if legal.contains(&granularity) {
        return Ok(());
    }
    let allowed: Vec<&str> = legal.iter().map(Granularity::as_str).collect();
    Err(EngineError::BadRequest(format!(
        "granularity {:?} is not allowed for a {span_days}-day span (allowed: {})",
        granularity.as_str(),
        allowed.join(", ")
    )))
}

fn parse_date(raw: &str) -> EngineResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::BadRequest(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
}

/// Convert a timezone-local wall time to naive UTC. An ambiguous local
/// time (DST fall-back) resolves to the earlier instant; a nonexistent one
/// (spring-forward gap) is a caller error.
fn local_to_utc(tz: Tz, local: NaiveDateTime) -> EngineResult<NaiveDateTime> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc).naive_utc()),
        LocalResult::Ambiguous(a, b) => Ok(a.min(b).with_timezone(&Utc).naive_utc()),
        LocalResult::None => Err(EngineError::BadRequest(
            "requested boundary does not exist in this timezone".to_string(),
        )),
    }
}

fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

fn day_end(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59).unwrap_or_default()
}

/// Snap a timestamp to the start of its granularity unit.
pub(crate) fn start_of_unit(dt: NaiveDateTime, granularity: Granularity) -> NaiveDateTime {
    let date = dt.date();
    match granularity {
        Granularity::Minute => date
            .and_hms_opt(dt.hour(), dt.minute(), 0)
            .unwrap_or(dt),
        Granularity::Hour => date.and_hms_opt(dt.hour(), 0, 0).unwrap_or(dt),
        Granularity::Day => day_start(date),
        Granularity::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
            .map(day_start)
            .unwrap_or(dt),
        Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)
            .map(day_start)
            .unwrap_or(dt),
    }
}

/// Snap an end date to the last second of its granularity unit.
fn end_of_unit(date: NaiveDate, granularity: Granularity) -> NaiveDateTime {
    match granularity {
        Granularity::Minute | Granularity::Hour | Granularity::Day => day_end(date),
        Granularity::Month => day_end(last_day_of_month(date)),
        Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 12, 31)
            .map(day_end)
            .unwrap_or_else(|| day_end(date)),
    }
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .map(|next| next - Duration::days(1))
        .unwrap_or(date)
}

fn sub_months(dt: NaiveDateTime, months: u32) -> NaiveDateTime {
    dt.checked_sub_months(Months::new(months)).unwrap_or(dt)
}
