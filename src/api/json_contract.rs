use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bus::PluginBus;
use crate::error::{PluginError, PluginResult};
use crate::extensions::{FocusSeriesKey, FocusSeriesMessage};

pub const BUS_STATE_JSON_SCHEMA_V1: u32 = 1;

/// Bus state worth keeping across a reload.
///
/// Cursor state is pointer-driven and rebuilt on the next move, so only
/// focus is persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedBusState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_series: Option<FocusSeriesMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStateJsonContractV1 {
    pub schema_version: u32,
    pub state: PersistedBusState,
}

impl PersistedBusState {
    #[must_use]
    pub fn capture(bus: &PluginBus) -> Self {
        Self {
            focus_series: bus.read::<FocusSeriesKey>(),
        }
    }

    /// Writes the persisted messages into `bus`, before charts mount.
    pub fn seed(&self, bus: &PluginBus) {
        debug!(focus = self.focus_series.is_some(), "seed bus state");
        bus.set::<FocusSeriesKey>(self.focus_series.clone());
    }

    pub fn to_json_contract_v1_pretty(&self) -> PluginResult<String> {
        let payload = BusStateJsonContractV1 {
            schema_version: BUS_STATE_JSON_SCHEMA_V1,
            state: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            PluginError::Persistence(format!("failed to serialize bus state contract v1: {e}"))
        })
    }

    /// Accepts a bare state object or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> PluginResult<Self> {
        let payload: BusStateJsonContractV1 = match serde_json::from_str(input) {
            Ok(payload) => payload,
            Err(contract_err) => {
                return serde_json::from_str::<Self>(input).map_err(|e| {
                    PluginError::Persistence(format!(
                        "failed to parse bus state json payload: {contract_err}; {e}"
                    ))
                });
            }
        };
        if payload.schema_version != BUS_STATE_JSON_SCHEMA_V1 {
            return Err(PluginError::Persistence(format!(
                "unsupported bus state schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.state)
    }
}
