use bon::Builder;
use chrono_tz::Tz;
use itertools::Itertools;
use serde::{Serialize, Serializer};

use crate::{
    core::{
        blackout::BlackoutSet,
        evaluate::{Evaluator, Objective, ResetPolicy},
        grid::{Bucket, CounterResetAnomaly, Grid},
        sample::{MalformedSampleError, Normalizer, RawSample},
        select::{NoCandidateError, Window, select_best},
        slot::HalfHourSlot,
        tariff::RateTable,
    },
    prelude::*,
    quantity::energy::KilowattHours,
};

/// Full configuration of a single window search.
#[must_use]
#[derive(Builder)]
pub struct Analysis {
    zone: Tz,
    rates: RateTable,

    #[builder(default)]
    blackout: BlackoutSet,

    #[builder(default)]
    objective: Objective,

    #[builder(default)]
    reset_policy: ResetPolicy,

    /// Where the grids are anchored within the day.
    #[builder(default = HalfHourSlot::MIDNIGHT)]
    grid_origin: HalfHourSlot,

    #[builder(default)]
    skip_leading_state: bool,
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum AnalysisError {
    #[display("malformed sample: {_0}")]
    MalformedSample(MalformedSampleError),

    #[display("aborted: {_0}")]
    CounterReset(CounterResetAnomaly),
}

#[must_use]
#[derive(Serialize)]
pub struct Report {
    pub hour_buckets: Vec<Bucket>,
    pub half_hour_buckets: Vec<Bucket>,

    /// Counter resets seen on the hour grid, the offset grid sees the same ones.
    pub anomalies: Vec<CounterResetAnomaly>,

    /// Consumption over the whole analysed period, counter resets left out.
    pub total_consumption: KilowattHours,

    #[serde(serialize_with = "serialize_window")]
    pub window: Result<Window, NoCandidateError>,
}

fn serialize_window<S: Serializer>(
    window: &Result<Window, NoCandidateError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    window.as_ref().ok().serialize(serializer)
}

impl Analysis {
    /// Normalize the samples, bucket them on both grids, score the buckets, and pick the window.
    #[instrument(skip_all, fields(zone = %self.zone, n_raw_samples = raw.len()))]
    pub fn run(&self, raw: &[RawSample]) -> Result<Report, AnalysisError> {
        let samples = Normalizer::builder()
            .zone(self.zone)
            .skip_leading_state(self.skip_leading_state)
            .build()
            .normalize(raw)?;

        let origin = self.grid_origin.start_time();
        let hour_buckets = Grid::HOUR.build(&samples, origin);
        let half_hour_buckets = Grid::HALF_HOUR_OFFSET.build(&samples, origin);

        let evaluator = Evaluator::builder()
            .rates(self.rates)
            .blackout(&self.blackout)
            .objective(self.objective)
            .reset_policy(self.reset_policy)
            .build();
        let hour_scored = evaluator.evaluate(&hour_buckets)?;
        let half_hour_scored = evaluator.evaluate(&half_hour_buckets)?;
        let window = select_best(&hour_scored, &half_hour_scored);
        if let Err(error) = &window {
            warn!("{error}");
        }

        let anomalies =
            hour_buckets.iter().flat_map(|bucket| bucket.resets.iter().copied()).collect_vec();
        let total_consumption: KilowattHours =
            hour_buckets.iter().map(Bucket::clamped_consumption).sum();
        info!(?total_consumption, n_anomalies = anomalies.len(), "analysed");

        Ok(Report { hour_buckets, half_hour_buckets, anomalies, total_consumption, window })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta};

    use super::*;
    use crate::{
        core::{
            grid::GridKind,
            sample::{RawValue, Status},
        },
        quantity::rate::KilowattHourRate,
    };

    const RATES: RateTable = RateTable {
        off_peak_shoulder: KilowattHourRate(0.1852),
        off_peak: KilowattHourRate(0.1323),
    };

    /// Half-hourly samples in UTC starting at the midnight of `date`.
    fn raw_samples(date: NaiveDate, counters: &[f64]) -> Vec<RawSample> {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        counters
            .iter()
            .zip(0..)
            .map(|(counter, i)| RawSample {
                timestamp: DateTime::from(midnight + TimeDelta::minutes(30) * i),
                value: RawValue::Text(counter.to_string()),
                status: Status::Ok,
            })
            .collect()
    }

    fn linear(n: u32, step: f64) -> Vec<f64> {
        (0..n).map(|i| f64::from(i) * step).collect()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn test_steady_consumption() -> Result {
        let report = Analysis::builder()
            .zone(Tz::UTC)
            .rates(RATES)
            .build()
            .run(&raw_samples(monday(), &linear(48, 1.0)))?;

        let window = report.window?;
        assert_eq!(window.grid, GridKind::Hour);
        assert_eq!(window.start, monday().and_hms_opt(9, 0, 0).unwrap());
        assert_eq!(window.end, monday().and_hms_opt(10, 0, 0).unwrap());
        assert_abs_diff_eq!(window.value.0, 0.3704, epsilon = 1e-9);
        assert_abs_diff_eq!(report.total_consumption.0, 47.0);
        assert!(report.anomalies.is_empty());
        Ok(())
    }

    #[test]
    fn test_counter_reset_is_surfaced() -> Result {
        let mut counters = linear(48, 1.0);
        counters[19] = 50.0;
        for (i, counter) in counters.iter_mut().enumerate().skip(20) {
            *counter = 0.2 + f64::from(u32::try_from(i - 20)?);
        }
        let samples = raw_samples(monday(), &counters);

        let report = Analysis::builder().zone(Tz::UTC).rates(RATES).build().run(&samples)?;
        assert_eq!(report.anomalies.len(), 1);
        assert_abs_diff_eq!(report.anomalies[0].before.0, 50.0);
        assert_abs_diff_eq!(report.anomalies[0].after.0, 0.2);
        let window = report.window?;
        assert!(window.consumption >= KilowattHours::ZERO);
        assert_ne!(window.start, monday().and_hms_opt(9, 0, 0).unwrap());

        let result = Analysis::builder()
            .zone(Tz::UTC)
            .rates(RATES)
            .reset_policy(ResetPolicy::Abort)
            .build()
            .run(&samples);
        assert!(matches!(result, Err(AnalysisError::CounterReset(_))));
        Ok(())
    }

    #[test]
    fn test_blackout_skips_the_best_bucket() -> Result {
        // Saturday, with a spike at 19:00:
        let saturday = NaiveDate::from_ymd_opt(2024, 7, 6).unwrap();
        let mut counters = linear(48, 1.0);
        for counter in &mut counters[39..] {
            *counter += 10.0;
        }
        for counter in &mut counters[41..] {
            *counter += 5.0;
        }
        let samples = raw_samples(saturday, &counters);
        let analysis = |blackout: BlackoutSet| {
            Analysis::builder().zone(Tz::UTC).rates(RATES).blackout(blackout).build().run(&samples)
        };

        let window = analysis(BlackoutSet::default())?.window?;
        assert_eq!(window.start, saturday.and_hms_opt(19, 0, 0).unwrap());

        // The offset grid still catches the spike:
        let blackout: BlackoutSet = ["07:00 PM".parse::<HalfHourSlot>()?].into_iter().collect();
        let window = analysis(blackout)?.window?;
        assert_eq!(window.grid, GridKind::HalfHourOffset);
        assert_eq!(window.start, saturday.and_hms_opt(18, 30, 0).unwrap());

        // Both the spike buckets are forbidden, the next best ones tie at 20:00 and 19:30:
        let blackout: BlackoutSet = ["06:30 PM", "07:00 PM"]
            .iter()
            .map(|label| label.parse::<HalfHourSlot>())
            .try_collect()?;
        let window = analysis(blackout)?.window?;
        assert_eq!(window.grid, GridKind::Hour);
        assert_eq!(window.start, saturday.and_hms_opt(20, 0, 0).unwrap());
        assert_abs_diff_eq!(window.consumption.0, 7.0);
        Ok(())
    }

    #[test]
    fn test_no_candidate_is_not_fatal() -> Result {
        // 07:00 → 09:00 on a weekday is peak only:
        let start = monday().and_hms_opt(7, 0, 0).unwrap().and_utc();
        let raw = (0..4)
            .map(|i| RawSample {
                timestamp: DateTime::from(start + TimeDelta::minutes(30) * i),
                value: RawValue::Number(f64::from(i)),
                status: Status::Ok,
            })
            .collect_vec();
        let report = Analysis::builder()
            .zone(Tz::UTC)
            .rates(RATES)
            .grid_origin("07:00 AM".parse::<HalfHourSlot>()?)
            .build()
            .run(&raw)?;
        assert_eq!(report.hour_buckets.len(), 2);
        assert!(report.window.is_err());
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result {
        let samples = raw_samples(monday(), &linear(48, 0.7));
        let analysis = Analysis::builder()
            .zone(Tz::UTC)
            .rates(RATES)
            .blackout(BlackoutSet::operator_default())
            .build();
        let lhs = serde_json::to_string(&analysis.run(&samples)?)?;
        let rhs = serde_json::to_string(&analysis.run(&samples)?)?;
        assert_eq!(lhs, rhs);
        Ok(())
    }

    #[test]
    fn test_fall_back_day_has_no_double_hour() -> Result {
        // Local midnight of 2024-04-07 in Auckland, still NZDT:
        let midnight = NaiveDate::from_ymd_opt(2024, 4, 6).unwrap().and_hms_opt(11, 0, 0).unwrap();
        let raw = (0..51)
            .map(|i| RawSample {
                timestamp: DateTime::from(midnight.and_utc() + TimeDelta::minutes(30) * i),
                value: RawValue::Number(f64::from(i)),
                status: Status::Ok,
            })
            .collect_vec();
        let report = Analysis::builder()
            .zone(chrono_tz::Pacific::Auckland)
            .rates(RATES)
            .objective(Objective::MaximizeConsumption)
            .build()
            .run(&raw)?;

        assert_eq!(report.hour_buckets.len(), 25);
        let window = report.window?;
        assert_abs_diff_eq!(window.consumption.0, 2.0);
        assert_eq!(window.grid, GridKind::Hour);
        assert_eq!(window.start.time(), NaiveTime::MIN);
        Ok(())
    }

    #[test]
    fn test_empty() -> Result {
        let report = Analysis::builder().zone(Tz::UTC).rates(RATES).build().run(&[])?;
        assert!(report.hour_buckets.is_empty());
        assert!(report.window.is_err());
        Ok(())
    }
}
