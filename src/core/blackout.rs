use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::slot::HalfHourSlot;

/// Start times that the grid operator does not allow for the window.
#[must_use]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlackoutSet(BTreeSet<HalfHourSlot>);

impl FromIterator<HalfHourSlot> for BlackoutSet {
    fn from_iter<T: IntoIterator<Item = HalfHourSlot>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl BlackoutSet {
    /// Restricted starts published by the operator: the morning and evening ramps, and the last
    /// slot of the day, which would cross midnight.
    pub const DEFAULT_LABELS: [&'static str; 15] = [
        "06:30 AM", "07:00 AM", "07:30 AM", "08:00 AM", "08:30 AM", "04:30 PM", "05:00 PM",
        "05:30 PM", "06:00 PM", "06:30 PM", "07:00 PM", "07:30 PM", "08:00 PM", "08:30 PM",
        "11:30 PM",
    ];

    pub fn operator_default() -> Self {
        Self::DEFAULT_LABELS.iter().filter_map(|label| label.parse::<HalfHourSlot>().ok()).collect()
    }

    #[must_use]
    pub fn contains(&self, slot: HalfHourSlot) -> bool {
        self.0.contains(&slot)
    }

    /// Check whether a window may not start at the civil time.
    ///
    /// Times off the half-hour grid are never blacked out since no slot label matches them.
    #[must_use]
    pub fn forbids(&self, start: NaiveDateTime) -> bool {
        HalfHourSlot::try_from(start.time()).is_ok_and(|slot| self.contains(slot))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
