use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::bus::{PluginBus, TaskQueue};
use crate::core::ChartRef;

/// Lifecycle hook set a plugin contributes to a chart.
///
/// The host invokes hooks in plugin registration order. Every hook defaults
/// to a no-op, so a plugin with nothing to do is an empty hook set.
pub trait ChartPlugin {
    fn id(&self) -> &str;

    /// Chart created and attached.
    fn ready(&mut self, _chart: &ChartRef) {}

    /// Cursor index changed.
    fn set_cursor(&mut self, _chart: &ChartRef) {}

    /// Data reassigned (full replace or streaming append/shift).
    fn set_data(&mut self, _chart: &ChartRef) {}

    /// Plotting area resized.
    fn set_size(&mut self, _chart: &ChartRef) {}

    /// Chart torn down. Must remove listeners and bus state synchronously.
    fn destroy(&mut self, _chart: &ChartRef) {}
}

/// Shared resources handed to plugin factories.
#[derive(Debug, Clone, Default)]
pub struct PluginFactoryContext {
    pub bus: Option<PluginBus>,
    pub tasks: TaskQueue,
}

impl PluginFactoryContext {
    #[must_use]
    pub fn new(bus: Option<PluginBus>, tasks: TaskQueue) -> Self {
        Self { bus, tasks }
    }
}

pub type PluginFactory = Rc<dyn Fn(&PluginFactoryContext) -> Box<dyn ChartPlugin>>;

/// A plugin as supplied by the caller: ready-made, or built against the
/// chart group's bus.
pub enum PluginSpec {
    Static(Box<dyn ChartPlugin>),
    Factory(PluginFactory),
}

impl PluginSpec {
    #[must_use]
    pub fn plugin(plugin: impl ChartPlugin + 'static) -> Self {
        Self::Static(Box::new(plugin))
    }

    #[must_use]
    pub fn factory(
        factory: impl Fn(&PluginFactoryContext) -> Box<dyn ChartPlugin> + 'static,
    ) -> Self {
        Self::Factory(Rc::new(factory))
    }

    #[must_use]
    pub fn resolve(self, ctx: &PluginFactoryContext) -> Box<dyn ChartPlugin> {
        match self {
            Self::Static(plugin) => plugin,
            Self::Factory(factory) => factory(ctx),
        }
    }
}

impl fmt::Debug for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(plugin) => f.debug_tuple("Static").field(&plugin.id()).finish(),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// Resolves caller-supplied specs into uniform hook sets, in order.
#[must_use]
pub fn resolve_plugins(
    specs: Vec<PluginSpec>,
    ctx: &PluginFactoryContext,
) -> Vec<Box<dyn ChartPlugin>> {
    specs.into_iter().map(|spec| spec.resolve(ctx)).collect()
}

/// Empty hook set returned by plugins that cannot operate.
#[derive(Debug, Clone)]
pub struct NoopPlugin {
    id: String,
}

impl NoopPlugin {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl ChartPlugin for NoopPlugin {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Returns the context bus, or warns once and returns `None`.
pub(crate) fn require_bus(ctx: &PluginFactoryContext, plugin_id: &str) -> Option<PluginBus> {
    if ctx.bus.is_none() {
        warn!(
            plugin = plugin_id,
            "a plugin bus is required; plugin disabled"
        );
    }
    ctx.bus.clone()
}
