use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{ChartHost, HostState};

/// Engine hook points forwarded to plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleHook {
    Ready,
    SetCursor,
    SetData,
    SetSize,
    Destroy,
}

impl LifecycleHook {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::SetCursor => "setCursor",
            Self::SetData => "setData",
            Self::SetSize => "setSize",
            Self::Destroy => "destroy",
        }
    }
}

impl ChartHost {
    /// Invokes `hook` on every plugin in registration order.
    ///
    /// Hooks other than `ready`/`destroy` are dropped unless the chart is
    /// ready.
    pub(super) fn dispatch(&mut self, hook: LifecycleHook) {
        let active = match hook {
            LifecycleHook::Ready | LifecycleHook::Destroy => self.state != HostState::Destroyed,
            _ => self.state == HostState::Ready,
        };
        if !active {
            trace!(chart = %self.chart.id(), hook = hook.as_str(), state = ?self.state, "skip hook");
            return;
        }

        trace!(chart = %self.chart.id(), hook = hook.as_str(), plugins = self.plugins.len(), "dispatch hook");
        for plugin in &mut self.plugins {
            match hook {
                LifecycleHook::Ready => plugin.ready(&self.chart),
                LifecycleHook::SetCursor => plugin.set_cursor(&self.chart),
                LifecycleHook::SetData => plugin.set_data(&self.chart),
                LifecycleHook::SetSize => plugin.set_size(&self.chart),
                LifecycleHook::Destroy => plugin.destroy(&self.chart),
            }
        }
    }
}
