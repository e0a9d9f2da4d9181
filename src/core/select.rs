use chrono::{NaiveDateTime, TimeDelta};
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::{
    core::{evaluate::ScoredBucket, grid::GridKind, slot::HalfHourSlot, tariff::Period},
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours},
};

/// The selected Hour of Power.
#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct Window {
    /// Grid that produced the window.
    pub grid: GridKind,

    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub period: Period,
    pub consumption: KilowattHours,
    pub cost: Cost,
    pub value: OrderedFloat<f64>,
}

impl Window {
    pub const DURATION: TimeDelta = TimeDelta::hours(1);

    /// Start slot as understood by the decision sink.
    pub fn start_slot(&self) -> Result<HalfHourSlot> {
        Ok(HalfHourSlot::try_from(self.start.time())?)
    }

    /// 12-hour clock label of the end time.
    #[must_use]
    pub fn end_label(&self) -> String {
        self.end.format(HalfHourSlot::FORMAT).to_string()
    }
}

impl From<&ScoredBucket> for Window {
    fn from(scored: &ScoredBucket) -> Self {
        Self {
            grid: scored.bucket.grid,
            start: scored.bucket.start,
            end: scored.bucket.end,
            period: scored.bucket.period,
            consumption: scored.consumption,
            cost: scored.cost,
            value: scored.value,
        }
    }
}

/// No eligible bucket on either grid.
#[derive(Copy, Clone, Debug, derive_more::Display, derive_more::Error)]
#[display("no optimal window found")]
pub struct NoCandidateError;

/// Pick the best window across the two grids.
///
/// Each grid contributes its own best bucket. The strictly greater value wins, the hour grid wins
/// a tie.
#[instrument(skip_all, fields(n_hour = hour.len(), n_half_hour = half_hour.len()))]
pub fn select_best(
    hour: &[ScoredBucket],
    half_hour: &[ScoredBucket],
) -> Result<Window, NoCandidateError> {
    let best_hour = hour.iter().min_by(|lhs, rhs| lhs.rank(rhs));
    let best_half_hour = half_hour.iter().min_by(|lhs, rhs| lhs.rank(rhs));
    let best = match (best_hour, best_half_hour) {
        (Some(hour), Some(half_hour)) if half_hour.value > hour.value => half_hour,
        (Some(hour), _) => hour,
        (None, Some(half_hour)) => half_hour,
        (None, None) => return Err(NoCandidateError),
    };
    let window = Window::from(best);
    info!(
        grid = %window.grid,
        start = %window.start,
        consumption = ?window.consumption,
        cost = ?window.cost,
        "selected"
    );
    Ok(window)
}
