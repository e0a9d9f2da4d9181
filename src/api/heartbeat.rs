use std::time::Duration;

use reqwest::Url;

use crate::{api::client, prelude::*};

/// Dead man's switch, pinged after a successful run.
pub struct Client {
    inner: reqwest::Client,
    url: Url,
}

impl Client {
    pub fn try_new(url: Url, timeout: Duration) -> Result<Self> {
        Ok(Self { inner: client::try_new(timeout)?, url })
    }

    /// Send the heartbeat. A failure is logged and otherwise ignored.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn send(&self) {
        info!("sending a heartbeat…");
        let result = async {
            self.inner.post(self.url.clone()).send().await?.error_for_status()?;
            Ok::<_, reqwest::Error>(())
        }
        .await;
        if let Err(error) = result {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }
}
