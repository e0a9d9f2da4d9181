use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};

use crate::{
    cli::{analysis::AnalysisArgs, home_assistant::HomeAssistantArgs, tariff::TariffArgs},
    core::sample::Normalizer,
    prelude::*,
    tables::{build_samples_table, build_slots_table},
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[command(subcommand)]
    command: BurrowCommand,
}

impl BurrowArgs {
    pub async fn run(self, timeout: Duration) -> Result {
        match self.command {
            BurrowCommand::Slots(args) => args.run(),
            BurrowCommand::History(args) => args.run(timeout).await,
        }
    }
}

#[derive(Subcommand)]
enum BurrowCommand {
    /// List the half-hour slots with their tariff periods and blackouts.
    Slots(BurrowSlotsArgs),

    /// Fetch and print the normalized meter history.
    History(Box<BurrowHistoryArgs>),
}

#[derive(Parser)]
struct BurrowSlotsArgs {
    /// Day which determines the tariff periods, defaults to today in the tariff time zone.
    #[clap(long = "date", env = "DATE")]
    date: Option<NaiveDate>,

    #[clap(long = "timezone", env = "TIMEZONE", default_value = "Pacific/Auckland")]
    zone: Tz,

    #[clap(flatten)]
    tariff: TariffArgs,
}

impl BurrowSlotsArgs {
    fn run(self) -> Result {
        let date = self
            .date
            .unwrap_or_else(|| chrono::Utc::now().with_timezone(&self.zone).date_naive());
        let tariff = self.tariff.load()?;
        info!(%date, weekday = %date.format("%A"), "slots");
        println!("{}", build_slots_table(date, &tariff.blackout));
        Ok(())
    }
}

#[derive(Parser)]
struct BurrowHistoryArgs {
    #[clap(flatten)]
    home_assistant: HomeAssistantArgs,

    #[clap(flatten)]
    analysis: AnalysisArgs,
}

impl BurrowHistoryArgs {
    #[instrument(skip_all)]
    async fn run(self, timeout: Duration) -> Result {
        let (since, until) = self.analysis.period()?;
        let raw_samples = self
            .home_assistant
            .try_new_api(timeout)?
            .get_history(&self.home_assistant.entity_id, &since, &until)
            .await?;
        let samples = Normalizer::builder()
            .zone(self.analysis.zone)
            .skip_leading_state(true)
            .build()
            .normalize(&raw_samples)?;
        println!("{}", build_samples_table(&samples));
        Ok(())
    }
}
