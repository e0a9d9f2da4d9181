use async_trait::async_trait;
use serde::Serialize;

use crate::{
    api::home_assistant,
    core::{grid::GridKind, select::Window},
    prelude::*,
};

/// Downstream consumer of the selected window.
#[async_trait]
pub trait DecisionSink: Send + Sync {
    async fn publish(&self, window: &Window) -> Result;
}

/// Home Assistant sensor which state is the start slot label, for example `09:00 AM`.
pub struct HomeAssistantSensor {
    api: home_assistant::Api,
    entity_id: String,
}

impl HomeAssistantSensor {
    pub const fn new(api: home_assistant::Api, entity_id: String) -> Self {
        Self { api, entity_id }
    }
}

#[derive(Serialize)]
struct SensorAttributes {
    /// 1-based slot index.
    slot: u8,

    end: String,
    consumption_kwh: f64,
    cost: f64,
    grid: GridKind,
    friendly_name: &'static str,
    icon: &'static str,
}

impl TryFrom<&Window> for SensorAttributes {
    type Error = Error;

    fn try_from(window: &Window) -> Result<Self> {
        Ok(Self {
            slot: window.start_slot()?.index(),
            end: window.end_label(),
            consumption_kwh: window.consumption.0,
            cost: window.cost.round_to_mills().0,
            grid: window.grid,
            friendly_name: "Hour of Power",
            icon: "mdi:lightning-bolt",
        })
    }
}

#[async_trait]
impl DecisionSink for HomeAssistantSensor {
    #[instrument(skip_all, fields(entity_id = %self.entity_id))]
    async fn publish(&self, window: &Window) -> Result {
        let slot = window.start_slot().context("the window must start on a half-hour slot")?;
        let attributes = SensorAttributes::try_from(window)?;
        self.api.set_state(&self.entity_id, &slot.to_string(), &attributes).await?;
        info!(%slot, "published");
        Ok(())
    }
}
