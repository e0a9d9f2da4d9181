use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::{Client, Url, header::CONTENT_TYPE};
use serde::Serialize;

use crate::{
    api::client,
    core::{select::Window, slot::HalfHourSlot},
    prelude::*,
};

#[must_use]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn selected(date: NaiveDate, window: &Window) -> Self {
        Self {
            title: format!(
                "Hour of Power set: {:?} @ {}",
                window.consumption,
                window.start.format(HalfHourSlot::FORMAT),
            ),
            message: format!(
                "{date}: {} to {} ({}, {} grid), {} at {}",
                window.start.format("%H:%M"),
                window.end.format("%H:%M"),
                window.period,
                window.grid,
                window.consumption,
                window.cost,
            ),
        }
    }

    pub fn no_candidate(date: NaiveDate) -> Self {
        Self {
            title: "No optimal window found".to_string(),
            message: format!("{date}: no eligible bucket on either grid"),
        }
    }

    /// The run did not get to a decision.
    pub fn failed(date: NaiveDate, error: &Error) -> Self {
        Self {
            title: "Hour of Power failed".to_string(),
            message: format!("{date}: {error:#}"),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, notification: &Notification) -> Result;
}

/// Deliver the notification through every notifier, logging the failures.
pub async fn notify_all(notifiers: &[Box<dyn Notifier>], notification: &Notification) {
    for notifier in notifiers {
        match notifier.notify(notification).await {
            Ok(()) => info!(notifier = notifier.name(), "notified"),
            Err(error) => warn!(notifier = notifier.name(), "failed to notify: {error:#}"),
        }
    }
}

pub struct Pushover {
    client: Client,
    token: String,
    user: String,
}

impl Pushover {
    const URL: &'static str = "https://api.pushover.net/1/messages.json";

    pub fn try_new(token: String, user: String, timeout: Duration) -> Result<Self> {
        Ok(Self { client: client::try_new(timeout)?, token, user })
    }

    fn body(&self, notification: &Notification) -> Result<String> {
        let message = PushoverMessage {
            token: &self.token,
            user: &self.user,
            title: &notification.title,
            message: &notification.message,
        };
        Ok(serde_qs::to_string(&message)?)
    }
}

#[derive(Serialize)]
struct PushoverMessage<'a> {
    token: &'a str,
    user: &'a str,
    title: &'a str,
    message: &'a str,
}

#[async_trait]
impl Notifier for Pushover {
    fn name(&self) -> &'static str {
        "pushover"
    }

    #[instrument(skip_all, fields(title = %notification.title))]
    async fn notify(&self, notification: &Notification) -> Result {
        self.client
            .post(Self::URL)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(self.body(notification)?)
            .send()
            .await?
            .error_for_status()
            .context("Pushover rejected the message")?;
        Ok(())
    }
}

pub struct Discord {
    client: Client,
    webhook_url: Url,
}

impl Discord {
    const USERNAME: &'static str = "hopper";
    const COLOR: u32 = 0x03_B2_F8;

    pub fn try_new(webhook_url: Url, timeout: Duration) -> Result<Self> {
        Ok(Self { client: client::try_new(timeout)?, webhook_url })
    }
}

#[derive(Serialize)]
struct DiscordWebhook<'a> {
    username: &'a str,
    embeds: [DiscordEmbed<'a>; 1],
}

#[derive(Serialize)]
struct DiscordEmbed<'a> {
    title: &'a str,
    description: &'a str,
    color: u32,
    timestamp: String,
}

impl<'a> DiscordWebhook<'a> {
    fn new(notification: &'a Notification) -> Self {
        Self {
            username: Discord::USERNAME,
            embeds: [DiscordEmbed {
                title: &notification.title,
                description: &notification.message,
                color: Discord::COLOR,
                timestamp: Utc::now().to_rfc3339(),
            }],
        }
    }
}

#[async_trait]
impl Notifier for Discord {
    fn name(&self) -> &'static str {
        "discord"
    }

    #[instrument(skip_all, fields(title = %notification.title))]
    async fn notify(&self, notification: &Notification) -> Result {
        self.client
            .post(self.webhook_url.clone())
            .json(&DiscordWebhook::new(notification))
            .send()
            .await?
            .error_for_status()
            .context("Discord rejected the webhook")?;
        Ok(())
    }
}
