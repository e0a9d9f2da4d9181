#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod core;
mod prelude;
mod quantity;
mod tables;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command},
    prelude::*,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();

    match args.command {
        Command::Hunt(hunt_args) => {
            hunt_args.run(args.http_timeout).await?;
            args.heartbeat.send(args.http_timeout).await;
        }
        Command::Burrow(burrow_args) => {
            burrow_args.run(args.http_timeout).await?;
        }
    }

    info!("done!");
    Ok(())
}
