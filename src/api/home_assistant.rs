use std::time::Duration;

use chrono::{DateTime, TimeZone};
use reqwest::{
    Client,
    ClientBuilder,
    Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize};

use crate::{
    core::sample::{MalformedSampleError, RawSample, RawValue, Status},
    prelude::*,
};

#[derive(Clone)]
pub struct Api {
    client: Client,
    base_url: Url,
}

impl Api {
    pub fn try_new(access_token: &str, base_url: Url, timeout: Duration) -> Result<Self> {
        let headers = HeaderMap::from_iter([(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {access_token}"))?,
        )]);
        let client = ClientBuilder::new().default_headers(headers).timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch the entity state changes within the period.
    #[instrument(skip_all, fields(entity_id = entity_id))]
    pub async fn get_history<Z: TimeZone>(
        &self,
        entity_id: &str,
        since: &DateTime<Z>,
        until: &DateTime<Z>,
    ) -> Result<Vec<RawSample>>
    where
        Z::Offset: std::fmt::Display,
    {
        let mut url = self.url(["history", "period", &since.to_rfc3339()])?;
        url.query_pairs_mut()
            .append_pair("filter_entity_id", entity_id)
            .append_pair("end_time", &until.to_rfc3339())
            .append_pair("minimal_response", "")
            .append_pair("no_attributes", "");
        let history: EntitiesHistory = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("failed to deserialize the history")?;
        let samples = history.into_raw_samples()?;
        info!(n_samples = samples.len(), "fetched");
        Ok(samples)
    }

    /// Create or update the entity state.
    #[instrument(skip_all, fields(entity_id = entity_id, state = state))]
    pub async fn set_state<A: Serialize + Sync>(
        &self,
        entity_id: &str,
        state: &str,
        attributes: &A,
    ) -> Result {
        let url = self.url(["states", entity_id])?;
        self.client
            .post(url)
            .json(&StateUpdate { state, attributes })
            .send()
            .await?
            .error_for_status()?;
        info!("updated");
        Ok(())
    }
}

#[derive(Serialize)]
struct StateUpdate<'a, A> {
    state: &'a str,
    attributes: &'a A,
}

/// One array of state changes per requested entity.
#[must_use]
#[derive(Deserialize)]
pub struct EntitiesHistory(pub Vec<Vec<State>>);

/// State change in the minimal response: only the first one carries the entity ID.
#[must_use]
#[derive(Deserialize)]
pub struct State {
    pub state: RawValue,

    /// ISO 8601, parsed per sample.
    pub last_changed: String,
}

impl EntitiesHistory {
    /// Convert the first entity's history, the one that has been asked for.
    pub fn into_raw_samples(self) -> Result<Vec<RawSample>, MalformedSampleError> {
        self.0
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, state)| state.into_raw_sample(index))
            .collect()
    }
}

impl State {
    fn into_raw_sample(self, index: usize) -> Result<RawSample, MalformedSampleError> {
        let timestamp = DateTime::parse_from_rfc3339(&self.last_changed).map_err(|source| {
            MalformedSampleError::Timestamp { index, timestamp: self.last_changed.clone(), source }
        })?;
        let status = match &self.state {
            RawValue::Text(text) if matches!(text.as_str(), "unavailable" | "unknown") => {
                Status::Unavailable
            }
            _ => Status::Ok,
        };
        Ok(RawSample { timestamp, value: self.state, status })
    }
}
