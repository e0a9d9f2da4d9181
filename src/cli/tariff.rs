use std::{fs, path::PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::{
    core::{blackout::BlackoutSet, slot::HalfHourSlot, tariff::RateTable},
    prelude::*,
    quantity::rate::KilowattHourRate,
};

#[derive(Parser)]
pub struct TariffArgs {
    #[clap(
        long = "off-peak-shoulder-rate",
        env = "OFF_PEAK_SHOULDER_RATE",
        default_value = "0.1546"
    )]
    pub off_peak_shoulder_rate: KilowattHourRate,

    #[clap(long = "off-peak-rate", env = "OFF_PEAK_RATE", default_value = "0.1104")]
    pub off_peak_rate: KilowattHourRate,

    /// Forbidden window starts, for example: `07:00 PM,07:30 PM`.
    #[clap(
        long = "blackout",
        env = "BLACKOUT",
        value_delimiter = ',',
        num_args = 1..,
        default_values = BlackoutSet::DEFAULT_LABELS,
    )]
    pub blackout: Vec<HalfHourSlot>,

    /// TOML file with the `[rates]` table and the `blackout` list, takes precedence over the flags.
    #[clap(long = "tariff-file", env = "TARIFF_FILE")]
    pub tariff_file: Option<PathBuf>,
}

/// Tariff as read from the file.
#[derive(Deserialize)]
pub struct Tariff {
    pub rates: RateTable,

    #[serde(default = "BlackoutSet::operator_default")]
    pub blackout: BlackoutSet,
}

impl Tariff {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn validate(&self) -> Result {
        ensure!(
            self.rates.off_peak_shoulder >= KilowattHourRate::ZERO,
            "the off-peak shoulder rate must not be negative, got {}",
            self.rates.off_peak_shoulder,
        );
        ensure!(
            self.rates.off_peak >= KilowattHourRate::ZERO,
            "the off-peak rate must not be negative, got {}",
            self.rates.off_peak,
        );
        Ok(())
    }
}

impl TariffArgs {
    pub fn load(&self) -> Result<Tariff> {
        let tariff = match &self.tariff_file {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read `{}`", path.display()))?;
                Tariff::from_toml(&text)
                    .with_context(|| format!("failed to parse `{}`", path.display()))?
            }
            None => Tariff {
                rates: RateTable {
                    off_peak_shoulder: self.off_peak_shoulder_rate,
                    off_peak: self.off_peak_rate,
                },
                blackout: self.blackout.iter().copied().collect(),
            },
        };
        tariff.validate()?;
        if tariff.blackout.is_empty() {
            warn!("no blackout slots, any non-peak start is allowed");
        }
        debug!(?tariff.rates, n_blackout_slots = tariff.blackout.len(), "loaded the tariff");
        Ok(tariff)
    }
}
