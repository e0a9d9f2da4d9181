use std::time::Duration;

use reqwest::Client;

use crate::prelude::*;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build a default client.
pub fn try_new(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?)
}
