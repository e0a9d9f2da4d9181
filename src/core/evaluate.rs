use std::cmp::Ordering;

use bon::Builder;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        blackout::BlackoutSet,
        grid::{Bucket, CounterResetAnomaly},
        tariff::RateTable,
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours},
};

/// What the window should maximise.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Consumption priced at the period rate.
    #[default]
    MaximizeValue,

    /// Plain consumption, regardless of the period rate.
    MaximizeConsumption,
}

/// What to do with a bucket in which the cumulative counter went backwards.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Do not consider the bucket for the window.
    #[default]
    Exclude,

    /// Leave the negative differences out of the bucket's consumption.
    Clamp,

    /// Fail the analysis.
    Abort,
}

#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct ScoredBucket {
    #[serde(flatten)]
    pub bucket: Bucket,

    /// Consumption the score was computed from, after applying the reset policy.
    pub consumption: KilowattHours,

    pub cost: Cost,

    /// Figure that the selector maximises, depends on the [`Objective`].
    pub value: OrderedFloat<f64>,
}

impl ScoredBucket {
    /// Higher value first, then the earlier start.
    pub fn rank(&self, other: &Self) -> Ordering {
        other.value.cmp(&self.value).then_with(|| self.bucket.start.cmp(&other.bucket.start))
    }
}

#[must_use]
#[derive(Builder)]
pub struct Evaluator<'a> {
    rates: RateTable,
    blackout: &'a BlackoutSet,

    #[builder(default)]
    objective: Objective,

    #[builder(default)]
    reset_policy: ResetPolicy,
}

impl Evaluator<'_> {
    /// Score the eligible buckets and rank them, best first.
    ///
    /// Peak and blacked-out buckets are left out.
    #[instrument(skip_all, fields(n_buckets = buckets.len(), objective = ?self.objective))]
    pub fn evaluate(&self, buckets: &[Bucket]) -> Result<Vec<ScoredBucket>, CounterResetAnomaly> {
        let mut scored = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            let Some(rate) = self.rates.get(bucket.period) else {
                continue;
            };
            if self.blackout.forbids(bucket.start) {
                trace!(start = %bucket.start, "blacked out");
                continue;
            }
            let consumption = match (bucket.resets.first(), self.reset_policy) {
                (None, _) => bucket.consumption,
                (Some(anomaly), ResetPolicy::Abort) => return Err(*anomaly),
                (Some(_), ResetPolicy::Exclude) => {
                    debug!(start = %bucket.start, "skipping the bucket with a counter reset");
                    continue;
                }
                (Some(_), ResetPolicy::Clamp) => bucket.clamped_consumption(),
            };
            let cost = consumption * rate;
            let value = match self.objective {
                Objective::MaximizeValue => cost.0,
                Objective::MaximizeConsumption => consumption.0,
            };
            scored.push(ScoredBucket {
                bucket: bucket.clone(),
                consumption,
                cost,
                value: OrderedFloat(value),
            });
        }
        let scored = scored.into_iter().sorted_by(ScoredBucket::rank).collect_vec();
        debug!(n_scored = scored.len(), "evaluated");
        Ok(scored)
    }
}
