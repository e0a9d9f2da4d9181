use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use clap::Parser;

use crate::{
    cli::tariff::{Tariff, TariffArgs},
    core::{
        analysis::Analysis,
        evaluate::{Objective, ResetPolicy},
        slot::HalfHourSlot,
    },
    prelude::*,
};

#[derive(Parser)]
pub struct AnalysisArgs {
    /// Day to analyse, defaults to today in the tariff time zone.
    #[clap(long = "date", env = "DATE")]
    pub date: Option<NaiveDate>,

    /// IANA time zone of the tariff.
    #[clap(long = "timezone", env = "TIMEZONE", default_value = "Pacific/Auckland")]
    pub zone: Tz,

    #[clap(long = "objective", env = "OBJECTIVE", default_value = "maximize-value")]
    pub objective: Objective,

    #[clap(long = "counter-reset-policy", env = "COUNTER_RESET_POLICY", default_value = "exclude")]
    pub reset_policy: ResetPolicy,

    /// Slot at which the hour grid starts, the offset grid follows 30 minutes later.
    #[clap(long = "grid-origin", env = "GRID_ORIGIN", default_value = "12:00 AM")]
    pub grid_origin: HalfHourSlot,

    #[clap(flatten)]
    pub tariff: TariffArgs,
}

impl AnalysisArgs {
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Utc::now().with_timezone(&self.zone).date_naive())
    }

    /// From the local midnight of the day until the next one.
    pub fn period(&self) -> Result<(DateTime<Tz>, DateTime<Tz>)> {
        let date = self.date();
        let next_date = date.succ_opt().context("the date is out of range")?;
        Ok((self.midnight(date)?, self.midnight(next_date)?))
    }

    fn midnight(&self, date: NaiveDate) -> Result<DateTime<Tz>> {
        self.zone
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .earliest()
            .with_context(|| format!("{date} has no midnight in {}", self.zone))
    }

    /// The history starts with the state at the period start, which is not a reading.
    pub fn build(&self, tariff: Tariff) -> Analysis {
        Analysis::builder()
            .zone(self.zone)
            .rates(tariff.rates)
            .blackout(tariff.blackout)
            .objective(self.objective)
            .reset_policy(self.reset_policy)
            .grid_origin(self.grid_origin)
            .skip_leading_state(true)
            .build()
    }
}
