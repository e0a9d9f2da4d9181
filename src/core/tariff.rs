use chrono::{Datelike, NaiveDateTime, Timelike};
use comfy_table::Color;
use serde::{Deserialize, Serialize};

use crate::quantity::rate::KilowattHourRate;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// Weekday mornings and evenings. Never eligible for the window.
    #[display("Peak")]
    Peak,

    /// Weekday day and late evening, weekend day.
    #[display("Shoulder")]
    OffPeakShoulder,

    /// Night, every day.
    #[display("Off-peak")]
    OffPeak,
}

impl Period {
    /// Tag the civil local time with its tariff period.
    ///
    /// Weekdays have two peak bands, `07:00..09:00` and `17:00..21:00`, and the shoulder in
    /// between and until `23:00`. Weekends have no peak: `07:00..23:00` is the shoulder. The night
    /// `23:00..07:00` is off-peak on every day.
    pub fn of(local_time: NaiveDateTime) -> Self {
        let hour = local_time.hour();
        if !(7..23).contains(&hour) {
            return Self::OffPeak;
        }
        let is_weekend = local_time.weekday().number_from_monday() >= 6;
        if !is_weekend && ((7..9).contains(&hour) || (17..21).contains(&hour)) {
            Self::Peak
        } else {
            Self::OffPeakShoulder
        }
    }

    pub const fn color(self) -> Color {
        match self {
            Self::Peak => Color::Red,
            Self::OffPeakShoulder => Color::DarkYellow,
            Self::OffPeak => Color::Green,
        }
    }
}

/// Unit rates of the priced periods, peak has none.
#[must_use]
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct RateTable {
    pub off_peak_shoulder: KilowattHourRate,
    pub off_peak: KilowattHourRate,
}

impl RateTable {
    /// Get the rate applicable to the period, `None` for peak.
    #[must_use]
    pub const fn get(&self, period: Period) -> Option<KilowattHourRate> {
        match period {
            Period::Peak => None,
            Period::OffPeakShoulder => Some(self.off_peak_shoulder),
            Period::OffPeak => Some(self.off_peak),
        }
    }
}
