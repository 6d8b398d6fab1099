//! Lifecycle driver standing in for the UI component that hosts a chart.
//!
//! [`ChartHost`] owns one chart's plugin list and forwards the engine's
//! lifecycle hooks to it in registration order.

mod json_contract;
mod plugin_dispatch;
mod plugin_registry;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bus::{PluginBus, TaskQueue};
use crate::core::{ChartRef, SeriesDataOptions, SeriesDatum, series_data};
use crate::extensions::{
    ChartPlugin, CursorMoveParams, CursorMovePlugin, PluginFactoryContext, PluginSpec,
    resolve_plugins,
};

pub use json_contract::{BUS_STATE_JSON_SCHEMA_V1, BusStateJsonContractV1, PersistedBusState};
pub use plugin_dispatch::LifecycleHook;

/// Metadata announced once the chart is ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnCreateMeta {
    pub series: Vec<SeriesDatum>,
}

pub type OnCreateCallback = Box<dyn Fn(&ChartRef, &OnCreateMeta)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostState {
    Created,
    Ready,
    Destroyed,
}

pub struct ChartHost {
    chart: ChartRef,
    bus: Option<PluginBus>,
    tasks: TaskQueue,
    plugins: Vec<Box<dyn ChartPlugin>>,
    on_create: Option<OnCreateCallback>,
    state: HostState,
}

impl ChartHost {
    /// Resolves `plugins` against `bus` and wraps `chart`.
    ///
    /// Later plugins whose id is already taken are dropped with a warning.
    #[must_use]
    pub fn new(chart: ChartRef, plugins: Vec<PluginSpec>, bus: Option<PluginBus>) -> Self {
        let mut builder = Self::builder(chart);
        if let Some(bus) = bus {
            builder = builder.bus(bus);
        }
        builder.plugins(plugins).build()
    }

    #[must_use]
    pub fn builder(chart: ChartRef) -> ChartHostBuilder {
        ChartHostBuilder {
            chart,
            bus: None,
            tasks: TaskQueue::new(),
            plugins: Vec::new(),
            on_create: None,
        }
    }

    #[must_use]
    pub fn chart(&self) -> &ChartRef {
        &self.chart
    }

    #[must_use]
    pub fn bus(&self) -> Option<&PluginBus> {
        self.bus.as_ref()
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    #[must_use]
    pub fn state(&self) -> HostState {
        self.state
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state == HostState::Destroyed
    }

    /// Runs every `ready` hook, then the creation callback.
    ///
    /// Only the first call dispatches; the metadata is returned either way.
    pub fn ready(&mut self) -> OnCreateMeta {
        let meta = OnCreateMeta {
            series: series_data(self.chart.as_ref(), &SeriesDataOptions::default()),
        };
        if self.state != HostState::Created {
            debug!(chart = %self.chart.id(), state = ?self.state, "ignore repeated ready");
            return meta;
        }

        self.state = HostState::Ready;
        self.dispatch(LifecycleHook::Ready);
        if let Some(on_create) = &self.on_create {
            on_create(&self.chart, &meta);
        }
        meta
    }

    pub fn set_cursor(&mut self) {
        self.dispatch(LifecycleHook::SetCursor);
    }

    pub fn set_data(&mut self) {
        self.dispatch(LifecycleHook::SetData);
    }

    pub fn set_size(&mut self) {
        self.dispatch(LifecycleHook::SetSize);
    }

    /// Runs every `destroy` hook and releases the plugins. Idempotent.
    pub fn destroy(&mut self) {
        if self.state == HostState::Destroyed {
            return;
        }
        if self.state == HostState::Ready {
            self.dispatch(LifecycleHook::Destroy);
        }
        self.state = HostState::Destroyed;
        self.plugins.clear();
        debug!(chart = %self.chart.id(), "chart host destroyed");
    }

    /// Drains deferred plugin work. Returns how many tasks ran.
    pub fn run_microtasks(&self) -> usize {
        self.tasks.run_pending()
    }

    fn factory_context(&self) -> PluginFactoryContext {
        PluginFactoryContext::new(self.bus.clone(), self.tasks.clone())
    }
}

impl Drop for ChartHost {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for ChartHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartHost")
            .field("chart", self.chart.id())
            .field("plugins", &self.plugin_ids())
            .field("bus", &self.bus)
            .field("state", &self.state)
            .finish()
    }
}

pub struct ChartHostBuilder {
    chart: ChartRef,
    bus: Option<PluginBus>,
    tasks: TaskQueue,
    plugins: Vec<PluginSpec>,
    on_create: Option<OnCreateCallback>,
}

impl ChartHostBuilder {
    #[must_use]
    pub fn bus(mut self, bus: PluginBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Shares a microtask queue with other hosts.
    #[must_use]
    pub fn tasks(mut self, tasks: TaskQueue) -> Self {
        self.tasks = tasks;
        self
    }

    #[must_use]
    pub fn plugin(mut self, plugin: PluginSpec) -> Self {
        self.plugins.push(plugin);
        self
    }

    #[must_use]
    pub fn plugins(mut self, plugins: impl IntoIterator<Item = PluginSpec>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    #[must_use]
    pub fn on_create(mut self, callback: impl Fn(&ChartRef, &OnCreateMeta) + 'static) -> Self {
        self.on_create = Some(Box::new(callback));
        self
    }

    /// Installs a cursor-move callback after the caller's plugins.
    #[must_use]
    pub fn on_cursor_move(mut self, callback: impl Fn(&CursorMoveParams<'_>) + 'static) -> Self {
        self.plugins
            .push(PluginSpec::plugin(CursorMovePlugin::new(callback)));
        self
    }

    #[must_use]
    pub fn build(self) -> ChartHost {
        let mut host = ChartHost {
            chart: self.chart,
            bus: self.bus,
            tasks: self.tasks,
            plugins: Vec::with_capacity(self.plugins.len()),
            on_create: self.on_create,
            state: HostState::Created,
        };

        let ctx = host.factory_context();
        for plugin in resolve_plugins(self.plugins, &ctx) {
            if host.has_plugin(plugin.id()) {
                warn!(
                    chart = %host.chart.id(),
                    plugin = plugin.id(),
                    "duplicate plugin id; keeping the first"
                );
                continue;
            }
            host.plugins.push(plugin);
        }
        debug!(
            chart = %host.chart.id(),
            plugins = host.plugins.len(),
            "chart host created"
        );
        host
    }
}
