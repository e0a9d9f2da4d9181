use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

use chrono::{NaiveTime, Timelike};
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// One of the 48 half-hour slots of a civil day, `12:00 AM` through `11:30 PM`.
///
/// This is also the vocabulary of the decision sink: a slot is addressed either by its 12-hour
/// clock label or by its 1-based index.
#[must_use]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct HalfHourSlot(u8);

impl HalfHourSlot {
    pub const N_SLOTS: u8 = 48;

    pub const MIDNIGHT: Self = Self(0);

    /// Label format expected by the operator, for example `07:30 PM`.
    pub const FORMAT: &'static str = "%I:%M %p";

    pub fn iter() -> impl Iterator<Item = Self> {
        (0..Self::N_SLOTS).map(Self)
    }

    /// Get the slot by its 1-based index.
    pub fn from_index(index: u8) -> Result<Self, InvalidSlotError> {
        if (1..=Self::N_SLOTS).contains(&index) {
            Ok(Self(index - 1))
        } else {
            Err(InvalidSlotError::Index(index))
        }
    }

    /// 1-based index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0 + 1
    }

    pub fn start_time(self) -> NaiveTime {
        let minutes = u32::from(self.0) * 30;
        NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl TryFrom<NaiveTime> for HalfHourSlot {
    type Error = InvalidSlotError;

    /// Only exact half-hour boundaries map onto a slot.
    fn try_from(time: NaiveTime) -> Result<Self, Self::Error> {
        if time.second() != 0 || time.nanosecond() != 0 || time.minute() % 30 != 0 {
            return Err(InvalidSlotError::Unaligned(time));
        }
        #[expect(clippy::cast_possible_truncation)]
        let index = (time.hour() * 2 + time.minute() / 30) as u8;
        Ok(Self(index))
    }
}

impl FromStr for HalfHourSlot {
    type Err = InvalidSlotError;

    /// Parse either the 12-hour clock label or the 1-based index.
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = label.trim().parse::<u8>() {
            return Self::from_index(index);
        }
        let time = NaiveTime::parse_from_str(label.trim(), Self::FORMAT)
            .map_err(|_| InvalidSlotError::Label(label.to_string()))?;
        Self::try_from(time)
    }
}

impl Display for HalfHourSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.start_time().format(Self::FORMAT))
    }
}

impl Debug for HalfHourSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}({self})", self.index())
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum InvalidSlotError {
    #[display("slot index must be within 1..=48, got {_0}")]
    Index(#[error(not(source))] u8),

    #[display("`{_0}` is not a 12-hour time label like `07:30 PM`")]
    Label(#[error(not(source))] String),

    #[display("{_0} is not aligned to a half hour")]
    Unaligned(#[error(not(source))] NaiveTime),
}
