use bon::Builder;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{prelude::*, quantity::energy::KilowattHours};

/// Meter reading as delivered by the telemetry source.
#[derive(Clone, Debug)]
pub struct RawSample {
    pub timestamp: DateTime<FixedOffset>,
    pub value: RawValue,
    pub status: Status,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    fn parse(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
        .filter(|value: &f64| value.is_finite())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,
    Unavailable,
}

/// Cumulative meter reading in the local civil time.
#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
pub struct NormalizedSample {
    pub local_time: DateTime<Tz>,
    pub counter: KilowattHours,
}

impl NormalizedSample {
    pub fn civil_time(&self) -> NaiveDateTime {
        self.local_time.naive_local()
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum MalformedSampleError {
    #[display("sample #{index}: `{value}` is not a number")]
    Value { index: usize, value: String },

    #[display("sample #{index}: `{timestamp}` is not an ISO 8601 timestamp")]
    Timestamp { index: usize, timestamp: String, source: chrono::ParseError },

    #[display("more than one sample at {timestamp}")]
    NotIncreasing { timestamp: DateTime<Utc> },
}

#[must_use]
#[derive(Builder)]
pub struct Normalizer {
    /// Civil time zone of the tariff.
    zone: Tz,

    /// The source prepends the current state to the history, drop it.
    #[builder(default)]
    skip_leading_state: bool,
}

impl Normalizer {
    #[instrument(skip_all, fields(n_raw_samples = raw.len()))]
    pub fn normalize(
        &self,
        raw: &[RawSample],
    ) -> Result<Vec<NormalizedSample>, MalformedSampleError> {
        let mut samples = raw
            .iter()
            .enumerate()
            .skip(usize::from(self.skip_leading_state))
            .filter(|(_, sample)| sample.status == Status::Ok)
            .map(|(index, sample)| {
                let counter = sample.value.parse().ok_or_else(|| MalformedSampleError::Value {
                    index,
                    value: match &sample.value {
                        RawValue::Number(value) => value.to_string(),
                        RawValue::Text(text) => text.clone(),
                    },
                })?;
                Ok((sample.timestamp.with_timezone(&Utc), KilowattHours(counter)))
            })
            .collect::<Result<Vec<_>, MalformedSampleError>>()?;
        samples.sort_by_key(|(timestamp, _)| *timestamp);

        if let Some(((timestamp, _), _)) =
            samples.iter().tuple_windows().find(|((lhs, _), (rhs, _))| lhs >= rhs)
        {
            return Err(MalformedSampleError::NotIncreasing { timestamp: *timestamp });
        }

        let samples = samples
            .into_iter()
            .map(|(timestamp, counter)| NormalizedSample {
                local_time: timestamp.with_timezone(&self.zone),
                counter,
            })
            .collect_vec();
        debug!(n_samples = samples.len(), "normalized");
        Ok(samples)
    }
}
