use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::bus::{BusKey, Merge, PluginBus};
use crate::core::{ChartHandle, ChartId, ChartRef, Position};
use crate::extensions::plugins::{
    ChartPlugin, NoopPlugin, PluginFactoryContext, PluginSpec, require_bus,
};
use crate::interaction::{ListenerId, PointerEventKind};

pub const CURSOR_PLUGIN_ID: &str = "cursor";

/// Point-in-time cursor reading for one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    pub plot_id: ChartId,
    pub idx: usize,
    pub x_value: f64,
    /// Plotting-area-relative pixels.
    pub position: Position,
    pub visible: bool,
}

impl CursorSnapshot {
    /// `false` once data shrank below the snapshot's index.
    #[must_use]
    pub fn is_within(&self, chart: &dyn ChartHandle) -> bool {
        self.idx < chart.data_len()
    }
}

/// Reads the chart's cursor. `None` when the index is missing or outside the
/// x series.
#[must_use]
pub fn cursor_snapshot(chart: &dyn ChartHandle) -> Option<CursorSnapshot> {
    let cursor = chart.cursor();
    let idx = cursor.idx?;
    if idx >= chart.data_len() {
        return None;
    }
    let x_value = chart.value(0, idx)?;

    Some(CursorSnapshot {
        plot_id: chart.id().clone(),
        idx,
        x_value,
        visible: cursor.show,
        position: Position::new(cursor.left.unwrap_or(0.0), cursor.top.unwrap_or(0.0)),
    })
}

/// Cursor state of every chart on a bus.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CursorMessage {
    /// Chart currently owning pointer interaction.
    pub source_id: Option<ChartId>,
    /// Latest snapshot per chart, in first-report order.
    pub state: IndexMap<ChartId, CursorSnapshot>,
}

impl CursorMessage {
    #[must_use]
    pub fn snapshot(&self, chart_id: &str) -> Option<&CursorSnapshot> {
        self.state.get(chart_id)
    }

    #[must_use]
    pub fn source_snapshot(&self) -> Option<&CursorSnapshot> {
        self.source_id.as_ref().and_then(|id| self.state.get(id))
    }

    #[must_use]
    pub fn is_source(&self, chart_id: &ChartId) -> bool {
        self.source_id.as_ref() == Some(chart_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CursorPatch {
    pub source_id: Option<Option<ChartId>>,
    pub state: Option<IndexMap<ChartId, CursorSnapshot>>,
}

impl CursorPatch {
    #[must_use]
    pub fn source(source_id: Option<ChartId>) -> Self {
        Self {
            source_id: Some(source_id),
            state: None,
        }
    }
}

impl Merge for CursorMessage {
    type Patch = CursorPatch;

    fn merge(&mut self, patch: CursorPatch) -> SmallVec<[&'static str; 4]> {
        let mut touched = SmallVec::new();
        if let Some(source_id) = patch.source_id {
            self.source_id = source_id;
            touched.push(CursorKey::SOURCE_FIELD);
        }
        if let Some(state) = patch.state {
            self.state = state;
            touched.push(CursorKey::STATE_FIELD);
        }
        touched
    }
}

pub struct CursorKey;

impl CursorKey {
    pub const SOURCE_FIELD: &'static str = "source_id";
    pub const STATE_FIELD: &'static str = "state";
}

impl BusKey for CursorKey {
    const NAME: &'static str = "cursor";
    type Message = CursorMessage;
}

/// Per-chart cursor lifecycle as seen through the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorPhase {
    /// Not attached, or the bus has no cursor slot.
    Idle,
    /// Attached; no chart owns the pointer.
    Armed,
    /// This chart owns the pointer.
    Active,
    /// Another chart owns the pointer.
    Tracking,
}

/// Cursor plugin factory.
///
/// Tracks pointer ownership and per-chart cursor snapshots under the
/// `cursor` bus key. Must precede plugins that consume cursor state.
#[must_use]
pub fn cursor() -> PluginSpec {
    PluginSpec::factory(|ctx: &PluginFactoryContext| {
        let Some(bus) = require_bus(ctx, CURSOR_PLUGIN_ID) else {
            return Box::new(NoopPlugin::new(CURSOR_PLUGIN_ID));
        };
        Box::new(CursorPlugin::new(bus))
    })
}

#[derive(Debug)]
pub struct CursorPlugin {
    bus: PluginBus,
    chart_id: Option<ChartId>,
    listeners: SmallVec<[ListenerId; 2]>,
}

impl CursorPlugin {
    /// Attaches to `bus`, creating an empty cursor slot if none exists.
    ///
    /// An existing slot is left alone: sibling charts may already have
    /// entries in it.
    #[must_use]
    pub fn new(bus: PluginBus) -> Self {
        if !bus.contains::<CursorKey>() {
            bus.set::<CursorKey>(Some(CursorMessage::default()));
        }
        Self {
            bus,
            chart_id: None,
            listeners: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> CursorPhase {
        let Some(chart_id) = &self.chart_id else {
            return CursorPhase::Idle;
        };
        let Some(message) = self.bus.read::<CursorKey>() else {
            return CursorPhase::Idle;
        };
        match &message.source_id {
            None => CursorPhase::Armed,
            Some(source) if source == chart_id => CursorPhase::Active,
            Some(_) => CursorPhase::Tracking,
        }
    }

    fn publish_snapshot(bus: &PluginBus, chart: &dyn ChartHandle) {
        let Some(snapshot) = cursor_snapshot(chart) else {
            trace!(chart = %chart.id(), "cursor outside data; keep previous snapshot");
            return;
        };
        let chart_id = chart.id().clone();
        bus.write_path::<CursorKey>(&[CursorKey::STATE_FIELD, chart_id.as_str()], |message| {
            message.state.insert(chart_id.clone(), snapshot);
        });
    }

    fn on_pointer_enter(bus: &PluginBus, chart: &Weak<dyn ChartHandle>) {
        let Some(chart) = chart.upgrade() else {
            return;
        };
        bus.batch(|| {
            bus.merge::<CursorKey>(CursorPatch::source(Some(chart.id().clone())));
            Self::publish_snapshot(bus, chart.as_ref());
        });
    }

    fn on_pointer_leave(bus: &PluginBus, chart_id: &ChartId) {
        // A sibling's enter may already have claimed the pointer.
        let owns_pointer = bus
            .read::<CursorKey>()
            .is_some_and(|message| message.is_source(chart_id));
        if owns_pointer {
            bus.merge::<CursorKey>(CursorPatch::source(None));
        }
    }
}

impl ChartPlugin for CursorPlugin {
    fn id(&self) -> &str {
        CURSOR_PLUGIN_ID
    }

    fn ready(&mut self, chart: &ChartRef) {
        let chart_id = chart.id().clone();
        debug!(chart = %chart_id, "cursor plugin attached");

        let weak = Rc::downgrade(chart);
        let enter_bus = self.bus.clone();
        let enter = chart.surface().add_listener(
            PointerEventKind::Enter,
            Rc::new(move |_| Self::on_pointer_enter(&enter_bus, &weak)),
        );

        let leave_bus = self.bus.clone();
        let leave_id = chart_id.clone();
        let leave = chart.surface().add_listener(
            PointerEventKind::Leave,
            Rc::new(move |_| Self::on_pointer_leave(&leave_bus, &leave_id)),
        );

        self.listeners.extend([enter, leave]);
        self.chart_id = Some(chart_id);
    }

    fn set_cursor(&mut self, chart: &ChartRef) {
        Self::publish_snapshot(&self.bus, chart.as_ref());
    }

    fn set_data(&mut self, chart: &ChartRef) {
        Self::publish_snapshot(&self.bus, chart.as_ref());
    }

    fn destroy(&mut self, chart: &ChartRef) {
        let Some(chart_id) = self.chart_id.take() else {
            return;
        };
        for listener in self.listeners.drain(..) {
            chart.surface().remove_listener(listener);
        }

        if self.bus.contains::<CursorKey>() {
            self.bus.batch(|| {
                self.bus.write_path::<CursorKey>(
                    &[CursorKey::STATE_FIELD, chart_id.as_str()],
                    |message| {
                        message.state.shift_remove(chart_id.as_str());
                    },
                );
                if self
                    .bus
                    .read::<CursorKey>()
                    .is_some_and(|message| message.is_source(&chart_id))
                {
                    self.bus.merge::<CursorKey>(CursorPatch::source(None));
                }
            });
        }
        debug!(chart = %chart_id, "cursor plugin detached");
    }
}
