use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    core::{sample::NormalizedSample, tariff::Period},
    prelude::*,
    quantity::energy::KilowattHours,
};

/// Regular partition of the time axis, labelled in civil time.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Grid {
    pub kind: GridKind,
    pub step: TimeDelta,
    pub offset: TimeDelta,
}

impl Grid {
    pub const HOUR: Self =
        Self { kind: GridKind::Hour, step: TimeDelta::hours(1), offset: TimeDelta::zero() };

    /// Same width as [`Grid::HOUR`], shifted by a half hour.
    pub const HALF_HOUR_OFFSET: Self = Self {
        kind: GridKind::HalfHourOffset,
        step: TimeDelta::hours(1),
        offset: TimeDelta::minutes(30),
    };
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    #[display("hour")]
    Hour,

    #[display("half-hour offset")]
    HalfHourOffset,
}

/// The cumulative counter went backwards between two consecutive samples.
///
/// Usually, this is a meter replacement, a sensor reset, or a clock skew on the source side.
#[must_use]
#[derive(Copy, Clone, Debug, Serialize, derive_more::Display, derive_more::Error)]
#[display("counter went back from {before} to {after} at {at}")]
pub struct CounterResetAnomaly {
    /// Civil time of the earlier sample.
    pub at: NaiveDateTime,

    pub before: KilowattHours,
    pub after: KilowattHours,
}

impl CounterResetAnomaly {
    pub fn delta(&self) -> KilowattHours {
        self.after - self.before
    }
}

#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct Bucket {
    pub grid: GridKind,

    /// Inclusive.
    pub start: NaiveDateTime,

    /// Exclusive.
    pub end: NaiveDateTime,

    /// Sum of the counter differences, including the negative ones.
    pub consumption: KilowattHours,

    pub period: Period,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resets: Vec<CounterResetAnomaly>,
}

impl Bucket {
    #[must_use]
    pub fn has_resets(&self) -> bool {
        !self.resets.is_empty()
    }

    /// Consumption with the negative differences left out.
    pub fn clamped_consumption(&self) -> KilowattHours {
        self.consumption - self.resets.iter().map(CounterResetAnomaly::delta).sum::<KilowattHours>()
    }
}

impl Grid {
    /// Aggregate the counter differences into the grid buckets.
    ///
    /// The axis starts at `origin` past the local midnight of the first sample's day, shifted by
    /// the grid offset. The buckets are cut on the real time axis, so a repeated civil hour on the
    /// fall-back day gets its own bucket, and the skipped one on the spring-forward day gets none.
    /// A difference belongs to the bucket containing its earlier sample. Buckets without any
    /// difference are not emitted.
    #[instrument(skip_all, fields(grid = %self.kind, n_samples = samples.len()))]
    pub fn build(self, samples: &[NormalizedSample], origin: NaiveTime) -> Vec<Bucket> {
        let Some(first) = samples.first() else {
            return Vec::new();
        };
        let axis_origin = Self::resolve_origin(first, origin) + self.offset;
        let step_seconds = self.step.num_seconds();

        let mut buckets: BTreeMap<i64, (KilowattHours, Vec<CounterResetAnomaly>)> =
            BTreeMap::new();
        for (from, to) in samples.iter().tuple_windows() {
            let index = (from.local_time - axis_origin).num_seconds().div_euclid(step_seconds);
            let delta = to.counter - from.counter;
            let (consumption, resets) = buckets.entry(index).or_default();
            *consumption += delta;
            if delta < KilowattHours::ZERO {
                let anomaly = CounterResetAnomaly {
                    at: from.civil_time(),
                    before: from.counter,
                    after: to.counter,
                };
                warn!(%anomaly, "counter reset");
                resets.push(anomaly);
            }
        }

        let buckets = buckets
            .into_iter()
            .map(|(index, (consumption, resets))| {
                let start = axis_origin + TimeDelta::seconds(index * step_seconds);
                let start_civil = start.naive_local();
                Bucket {
                    grid: self.kind,
                    start: start_civil,
                    end: (start + self.step).naive_local(),
                    consumption,
                    period: Period::of(start_civil),
                    resets,
                }
            })
            .collect_vec();
        debug!(n_buckets = buckets.len(), "built");
        buckets
    }

    /// Instant of the `origin` civil time on the first sample's day.
    ///
    /// An ambiguous time resolves to its earlier instant. A time skipped by the daylight saving
    /// shift is read with the first sample's UTC offset.
    fn resolve_origin(first: &NormalizedSample, origin: NaiveTime) -> DateTime<Tz> {
        let zone = first.local_time.timezone();
        let civil = first.civil_time().date().and_time(origin);
        zone.from_local_datetime(&civil).earliest().unwrap_or_else(|| {
            let utc_offset =
                TimeDelta::seconds(first.local_time.offset().fix().local_minus_utc().into());
            zone.from_utc_datetime(&(civil - utc_offset))
        })
    }
}

#[cfg(test)]
pub mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{NaiveDate, Timelike};

    use super::*;

    /// Counter incrementing by `step_kwh` every 30 minutes, `n` samples since the local midnight.
    pub fn half_hourly_samples(date: NaiveDate, n: i32, step_kwh: f64) -> Vec<NormalizedSample> {
        zoned_half_hourly_samples(Tz::UTC, date, n, step_kwh)
    }

    /// Same as [`half_hourly_samples`], but the samples are 30 real minutes apart in `zone`.
    pub fn zoned_half_hourly_samples(
        zone: Tz,
        date: NaiveDate,
        n: i32,
        step_kwh: f64,
    ) -> Vec<NormalizedSample> {
        let midnight = zone.from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap()).unwrap();
        (0..n)
            .map(|i| NormalizedSample {
                local_time: midnight + TimeDelta::minutes(30) * i,
                counter: KilowattHours(f64::from(i) * step_kwh),
            })
            .collect()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn test_hour_grid() {
        let buckets = Grid::HOUR.build(&half_hourly_samples(monday(), 48, 1.0), NaiveTime::MIN);
        assert_eq!(buckets.len(), 24);
        assert_eq!(buckets[0].start, monday().and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(buckets[0].end - buckets[0].start, TimeDelta::hours(1));
        assert_abs_diff_eq!(buckets[0].consumption.0, 2.0);
        assert_eq!(buckets[0].period, Period::OffPeak);
        assert_eq!(buckets[7].period, Period::Peak);
        assert_eq!(buckets[9].period, Period::OffPeakShoulder);

        // The last sample has no successor:
        assert_eq!(buckets[23].start, monday().and_hms_opt(23, 0, 0).unwrap());
        assert_abs_diff_eq!(buckets[23].consumption.0, 1.0);
    }

    #[test]
    fn test_half_hour_offset_grid() {
        let buckets =
            Grid::HALF_HOUR_OFFSET.build(&half_hourly_samples(monday(), 48, 1.0), NaiveTime::MIN);

        // The first difference lands in the bucket that starts before the midnight:
        let previous_day = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert_eq!(buckets[0].start, previous_day.and_hms_opt(23, 30, 0).unwrap());
        assert_abs_diff_eq!(buckets[0].consumption.0, 1.0);

        assert_eq!(buckets[1].start, monday().and_hms_opt(0, 30, 0).unwrap());
        assert_abs_diff_eq!(buckets[1].consumption.0, 2.0);
        assert_eq!(buckets.len(), 24);
    }

    #[test]
    fn test_grids_agree_on_constant_rate() {
        let samples = half_hourly_samples(monday(), 48, 0.25);
        let hour = Grid::HOUR.build(&samples, NaiveTime::MIN);
        let half_hour = Grid::HALF_HOUR_OFFSET.build(&samples, NaiveTime::MIN);

        for (lhs, rhs) in hour.iter().zip(half_hour.iter().skip(1)) {
            assert_eq!(rhs.start - lhs.start, TimeDelta::minutes(30));
        }
        // Interior buckets are complete on both grids:
        for bucket in hour.iter().take(23).chain(half_hour.iter().skip(1).take(22)) {
            assert_abs_diff_eq!(bucket.consumption.0, 0.5);
        }
    }

    #[test]
    fn test_gaps_are_not_zero_filled() {
        let mut samples = half_hourly_samples(monday(), 4, 1.0);
        let resumed = half_hourly_samples(monday(), 12, 1.0).split_off(10);
        samples.extend(resumed);

        let buckets = Grid::HOUR.build(&samples, NaiveTime::MIN);
        let starts = buckets.iter().map(|bucket| bucket.start).collect_vec();
        // 01:30 → 05:00 is a single long difference attributed to 01:00:
        assert_eq!(
            starts,
            [0, 1, 5].map(|hour| monday().and_hms_opt(hour, 0, 0).unwrap()).to_vec(),
        );
        assert_abs_diff_eq!(buckets[1].consumption.0, 8.0);
    }

    #[test]
    fn test_counter_reset_is_flagged() {
        let mut samples = half_hourly_samples(monday(), 5, 1.0);
        samples[2].counter = KilowattHours(50.0);
        samples[3].counter = KilowattHours(0.2);
        samples[4].counter = KilowattHours(1.2);

        let buckets = Grid::HOUR.build(&samples, NaiveTime::MIN);
        assert_eq!(buckets.len(), 2);
        assert!(!buckets[0].has_resets());

        let reset = &buckets[1];
        assert_eq!(reset.resets.len(), 1);
        assert_abs_diff_eq!(reset.resets[0].before.0, 50.0);
        assert_abs_diff_eq!(reset.resets[0].after.0, 0.2);
        assert_abs_diff_eq!(reset.consumption.0, -48.8, epsilon = 1e-9);
        assert_abs_diff_eq!(reset.clamped_consumption().0, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_custom_origin() {
        let origin = NaiveTime::from_hms_opt(0, 30, 0).unwrap();
        let buckets = Grid::HOUR.build(&half_hourly_samples(monday(), 6, 1.0), origin);
        assert_eq!(buckets[1].start, monday().and_hms_opt(0, 30, 0).unwrap());
    }

    #[test]
    fn test_empty() {
        assert!(Grid::HOUR.build(&[], NaiveTime::MIN).is_empty());
    }

    #[test]
    fn test_fall_back_keeps_repeated_hour_apart() {
        // 25 hours in Auckland, 02:00 → 03:00 happens twice:
        let date = NaiveDate::from_ymd_opt(2024, 4, 7).unwrap();
        let samples = zoned_half_hourly_samples(Tz::Pacific__Auckland, date, 51, 1.0);

        let buckets = Grid::HOUR.build(&samples, NaiveTime::MIN);
        assert_eq!(buckets.len(), 25);
        for bucket in &buckets {
            assert_abs_diff_eq!(bucket.consumption.0, 2.0);
        }
        let two_am = date.and_hms_opt(2, 0, 0).unwrap();
        assert_eq!(buckets.iter().filter(|bucket| bucket.start == two_am).count(), 2);
        assert_eq!(buckets[2].end, two_am);
        assert_eq!(buckets[3].end, date.and_hms_opt(3, 0, 0).unwrap());

        let buckets = Grid::HALF_HOUR_OFFSET.build(&samples, NaiveTime::MIN);
        assert_eq!(buckets.len(), 26);
        assert!(buckets.iter().all(|bucket| bucket.consumption <= KilowattHours(2.0)));
    }

    #[test]
    fn test_spring_forward_skips_missing_hour() {
        // 23 hours in Auckland, 02:00 → 03:00 does not exist:
        let date = NaiveDate::from_ymd_opt(2024, 9, 29).unwrap();
        let samples = zoned_half_hourly_samples(Tz::Pacific__Auckland, date, 47, 1.0);

        let buckets = Grid::HOUR.build(&samples, NaiveTime::MIN);
        assert_eq!(buckets.len(), 23);
        for bucket in &buckets {
            assert_abs_diff_eq!(bucket.consumption.0, 2.0);
        }
        assert!(buckets.iter().all(|bucket| bucket.start.hour() != 2));
        assert_eq!(buckets[2].start, date.and_hms_opt(3, 0, 0).unwrap());

        let buckets = Grid::HALF_HOUR_OFFSET.build(&samples, NaiveTime::MIN);
        assert!(buckets.iter().all(|bucket| bucket.consumption <= KilowattHours(2.0)));
    }

    #[test]
    fn test_origin_in_skipped_hour() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 29).unwrap();
        let samples = zoned_half_hourly_samples(Tz::Pacific__Auckland, date, 12, 1.0);
        let origin = NaiveTime::from_hms_opt(2, 30, 0).unwrap();

        // Read as 02:30 NZST, which is 03:30 NZDT:
        let buckets = Grid::HOUR.build(&samples, origin);
        assert!(buckets.iter().any(|bucket| bucket.start == date.and_hms_opt(3, 30, 0).unwrap()));
        assert!(buckets.iter().all(|bucket| bucket.consumption <= KilowattHours(2.0)));
    }

    #[test]
    fn test_display() {
        assert_eq!(GridKind::Hour.to_string(), "hour");
        assert_eq!(GridKind::HalfHourOffset.to_string(), "half-hour offset");
    }
}
