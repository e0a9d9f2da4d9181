use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use crate::{
    api::notify::{Discord, Notifier, Pushover},
    prelude::*,
};

#[derive(Parser)]
pub struct NotifyArgs {
    #[clap(long = "pushover-token", env = "PUSHOVER_API_TOKEN", requires = "pushover_user")]
    pub pushover_token: Option<String>,

    #[clap(long = "pushover-user", env = "PUSHOVER_USER_KEY", requires = "pushover_token")]
    pub pushover_user: Option<String>,

    #[clap(long = "discord-webhook-url", env = "DISCORD_WEBHOOK_URL")]
    pub discord_webhook_url: Option<Url>,
}

impl NotifyArgs {
    /// Build the configured notifiers, possibly none.
    pub fn notifiers(&self, timeout: Duration) -> Result<Vec<Box<dyn Notifier>>> {
        let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
        if let (Some(token), Some(user)) = (&self.pushover_token, &self.pushover_user) {
            notifiers.push(Box::new(Pushover::try_new(token.clone(), user.clone(), timeout)?));
        }
        if let Some(webhook_url) = &self.discord_webhook_url {
            notifiers.push(Box::new(Discord::try_new(webhook_url.clone(), timeout)?));
        }
        debug!(n_notifiers = notifiers.len(), "configured");
        Ok(notifiers)
    }
}
