mod analysis;
mod burrow;
mod heartbeat;
mod home_assistant;
mod hunt;
mod notify;
mod tariff;

use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::cli::{burrow::BurrowArgs, heartbeat::HeartbeatArgs, hunt::HuntArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    /// Timeout of every outgoing HTTP request, for example: `10s` or `1m 30s`.
    #[clap(
        long = "http-timeout",
        env = "HTTP_TIMEOUT",
        default_value = "10s",
        value_parser = humantime::parse_duration,
        global = true,
    )]
    pub http_timeout: Duration,

    #[clap(flatten)]
    pub heartbeat: HeartbeatArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: fetch the meter history, pick the Hour of Power, and publish it.
    #[clap(name = "hunt")]
    Hunt(Box<HuntArgs>),

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(Box<BurrowArgs>),
}
