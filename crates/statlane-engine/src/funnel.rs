//! Funnel conversion metrics.

use serde::Serialize;

use statlane_core::config::{DEFAULT_FUNNEL_MAX_STEPS, DEFAULT_FUNNEL_MIN_STEPS};
use statlane_core::error::{EngineError, EngineResult};

/// A raw per-step count from the session-level step-progression query.
/// The windowing function omits steps no session reached, so indices may
/// be sparse. `step_index` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFunnelStep {
    pub step_index: usize,
    pub count: i64,
}

/// Per-step funnel metrics after backfill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelResult {
    pub label: String,
    /// Sessions that reached this step.
    pub events: i64,
    /// Percentage of step-1 sessions that reached this step.
    pub events_perc: f64,
    /// Percentage of previous-step sessions that reached this step.
    pub events_perc_step: f64,
    /// Sessions lost between the previous step and this one.
    pub dropoff: i64,
    pub dropoff_perc_step: f64,
}

/// Compute funnel metrics from raw step counts, using the default step
/// limits.
///
/// Reaching step `k` implies reaching every step before it, so a step the
/// window function omitted inherits the reach of the nearest higher step
/// present. The backfilled sequence is monotonically non-increasing.
/// Empty input produces all-zero metrics for every step, not an error.
pub fn compute(raw: &[RawFunnelStep], labels: &[String]) -> EngineResult<Vec<FunnelResult>> {
    compute_with_limits(raw, labels, DEFAULT_FUNNEL_MIN_STEPS, DEFAULT_FUNNEL_MAX_STEPS)
}

/// [`compute`] with explicit step limits (see `Config::funnel_min_steps`).
pub fn compute_with_limits(
    raw: &[RawFunnelStep],
    labels: &[String],
    min_steps: usize,
    max_steps: usize,
) -> EngineResult<Vec<FunnelResult>> {
    let step_count = labels.len();
    if !(min_steps..=max_steps).contains(&step_count) {
        return Err(EngineError::BadRequest(format!(
            "funnel must have between {min_steps} and {max_steps} steps (got {step_count})"
        )));
    }

    let mut present: Vec<Option<i64>> = vec![None; step_count];
    for step in raw {
        if (1..=step_count).contains(&step.step_index) {
            present[step.step_index - 1] = Some(step.count.max(0));
        }
    }

    // Backfill from the deepest step toward the first, carrying the
    // highest reach seen so far downward.
    let mut counts = vec![0i64; step_count];
    let mut carry = 0i64;
    for idx in (0..step_count).rev() {
        if let Some(count) = present[idx] {
            carry = count.max(carry);
        }
        counts[idx] = carry;
    }

    let entered = counts[0];
    let mut results = Vec::with_capacity(step_count);
    for (idx, label) in labels.iter().enumerate() {
        let events = counts[idx];
        if idx == 0 {
            let full = if entered > 0 { 100.0 } else { 0.0 };
            results.push(FunnelResult {
                label: label.clone(),
                events,
                events_perc: full,
                events_perc_step: full,
                dropoff: 0,
                dropoff_perc_step: 0.0,
            });
            continue;
        }
        let previous = counts[idx - 1];
        let dropoff = previous - events;
        results.push(FunnelResult {
            label: label.clone(),
            events,
            events_perc: percentage(events, entered),
            events_perc_step: percentage(events, previous),
            dropoff,
            dropoff_perc_step: percentage(dropoff, previous),
        });
    }
    Ok(results)
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}
