use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::NaiveDate;
use clap::Parser;

use crate::{
    api::{
        notify::{Notification, notify_all},
        sink::{DecisionSink, HomeAssistantSensor},
    },
    cli::{analysis::AnalysisArgs, home_assistant::HomeAssistantArgs, notify::NotifyArgs},
    core::analysis::Report,
    prelude::*,
    tables::build_buckets_table,
};

#[derive(Parser)]
pub struct HuntArgs {
    /// Do not publish the decision nor send the notifications (dry run).
    #[clap(long)]
    pub scout: bool,

    /// Sensor that receives the selected start slot.
    #[clap(
        long = "decision-entity-id",
        env = "DECISION_ENTITY_ID",
        default_value = "sensor.ek_hop"
    )]
    pub decision_entity_id: String,

    /// Write the full report as JSON.
    #[clap(long = "dump", env = "DUMP_PATH")]
    pub dump_path: Option<PathBuf>,

    #[clap(flatten)]
    pub home_assistant: HomeAssistantArgs,

    #[clap(flatten)]
    pub analysis: AnalysisArgs,

    #[clap(flatten)]
    pub notify: NotifyArgs,
}

impl HuntArgs {
    /// Find the window and report the outcome, a failure included, to the notifiers.
    #[instrument(skip_all)]
    pub async fn run(self, timeout: Duration) -> Result {
        let date = self.analysis.date();
        let notifiers = self.notify.notifiers(timeout)?;
        let notification = match self.hunt(date, timeout).await {
            Ok(notification) => notification,
            Err(error) => {
                if !self.scout {
                    notify_all(&notifiers, &Notification::failed(date, &error)).await;
                }
                return Err(error);
            }
        };
        if !self.scout {
            notify_all(&notifiers, &notification).await;
        }
        Ok(())
    }

    async fn hunt(&self, date: NaiveDate, timeout: Duration) -> Result<Notification> {
        let (since, until) = self.analysis.period()?;
        info!(%date, %since, %until, "hunting…");

        let home_assistant = self.home_assistant.try_new_api(timeout)?;
        let raw_samples =
            home_assistant.get_history(&self.home_assistant.entity_id, &since, &until).await?;

        let tariff = self.analysis.tariff.load()?;
        let (rates, blackout) = (tariff.rates, tariff.blackout.clone());
        let report = self.analysis.build(tariff).run(&raw_samples)?;

        let window = report.window.as_ref().ok();
        for buckets in [&report.hour_buckets, &report.half_hour_buckets] {
            println!("{}", build_buckets_table(buckets, &rates, &blackout, window));
        }
        for anomaly in &report.anomalies {
            warn!(%anomaly, "counter reset");
        }
        info!(total_consumption = ?report.total_consumption, "analysed the day");
        if let Some(path) = &self.dump_path {
            dump(&report, path)?;
        }

        let Ok(window) = &report.window else {
            return Ok(Notification::no_candidate(date));
        };
        info!(
            grid = %window.grid,
            start = %window.start,
            end = %window.end,
            consumption = ?window.consumption,
            cost = ?window.cost,
            "found the Hour of Power"
        );
        if !self.scout {
            HomeAssistantSensor::new(home_assistant, self.decision_entity_id.clone())
                .publish(window)
                .await?;
        }
        Ok(Notification::selected(date, window))
    }
}

fn dump(report: &Report, path: &Path) -> Result {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("failed to write `{}`", path.display()))?;
    info!(path = %path.display(), "dumped the report");
    Ok(())
}
