use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use crate::{api::home_assistant, prelude::*};

#[derive(Parser)]
pub struct HomeAssistantArgs {
    /// Home Assistant API base URL. For example: `http://localhost:8123/api`.
    #[clap(long = "home-assistant-api-base-url", env = "HOME_ASSISTANT_API_BASE_URL")]
    pub base_url: Url,

    /// Home Assistant API access token.
    #[clap(long = "home-assistant-access-token", env = "HOME_ASSISTANT_ACCESS_TOKEN")]
    pub access_token: String,

    /// Cumulative energy meter sensor.
    #[clap(
        long = "home-assistant-entity-id",
        env = "HOME_ASSISTANT_ENTITY_ID",
        default_value = "sensor.house_energy"
    )]
    pub entity_id: String,
}

impl HomeAssistantArgs {
    pub fn try_new_api(&self, timeout: Duration) -> Result<home_assistant::Api> {
        home_assistant::Api::try_new(&self.access_token, self.base_url.clone(), timeout)
    }
}
