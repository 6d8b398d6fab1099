use tracing::debug;

use crate::error::{PluginError, PluginResult};
use crate::extensions::PluginSpec;

use super::{ChartHost, HostState};

impl ChartHost {
    /// Resolves and registers a plugin with a unique identifier.
    ///
    /// A plugin registered on a ready host receives `ready` immediately.
    pub fn register_plugin(&mut self, spec: PluginSpec) -> PluginResult<()> {
        if self.state == HostState::Destroyed {
            return Err(PluginError::InvalidData(
                "cannot register a plugin on a destroyed chart".to_owned(),
            ));
        }
        let mut plugin = spec.resolve(&self.factory_context());
        let plugin_id = plugin.id().to_owned();
        if plugin_id.is_empty() {
            return Err(PluginError::InvalidData(
                "plugin id must not be empty".to_owned(),
            ));
        }
        if self.has_plugin(&plugin_id) {
            return Err(PluginError::DuplicatePlugin(plugin_id));
        }

        if self.state == HostState::Ready {
            plugin.ready(&self.chart);
        }
        debug!(chart = %self.chart.id(), plugin = %plugin_id, "plugin registered");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Unregisters a plugin by id, running its `destroy` hook if the chart is
    /// ready. Returns `true` when removed.
    pub fn unregister_plugin(&mut self, plugin_id: &str) -> bool {
        let Some(position) = self
            .plugins
            .iter()
            .position(|plugin| plugin.id() == plugin_id)
        else {
            return false;
        };
        let mut plugin = self.plugins.remove(position);
        if self.state == HostState::Ready {
            plugin.destroy(&self.chart);
        }
        true
    }

    #[must_use]
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn has_plugin(&self, plugin_id: &str) -> bool {
        self.plugins.iter().any(|plugin| plugin.id() == plugin_id)
    }

    /// Registered ids in dispatch order.
    #[must_use]
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.id()).collect()
    }
}
