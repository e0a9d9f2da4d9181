use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use crate::{api::heartbeat, prelude::*};

#[derive(Parser)]
pub struct HeartbeatArgs {
    /// Pinged after a successful run.
    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    pub url: Option<Url>,
}

impl HeartbeatArgs {
    pub async fn send(&self, timeout: Duration) {
        let Some(url) = &self.url else {
            return;
        };
        match heartbeat::Client::try_new(url.clone(), timeout) {
            Ok(client) => client.send().await,
            Err(error) => warn!("failed to build the heartbeat client: {error:#}"),
        }
    }
}
