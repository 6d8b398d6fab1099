use std::cell::Cell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::bus::{BusKey, PluginBus, Subscription, TaskQueue};
use crate::core::{ChartHandle, ChartId, ChartRef, DEFAULT_Y_SCALE};
use crate::extensions::cursor::{CursorKey, CursorSnapshot};
use crate::extensions::plugins::{
    ChartPlugin, NoopPlugin, PluginFactoryContext, PluginSpec, require_bus,
};
use crate::interaction::{ListenerId, PointerEventKind};

pub const FOCUS_SERIES_PLUGIN_ID: &str = "focus-series";

pub const DEFAULT_PX_THRESHOLD: f64 = 5.0;
pub const DEFAULT_UNFOCUSED_ALPHA: f64 = 0.1;
pub const DEFAULT_FOCUSED_ALPHA: f64 = 1.0;

/// Identifies one series to emphasize.
///
/// Serialized as `{"label": ..}`, `{"index": ..}` or `{"zeroIndex": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeriesFocusTarget {
    Label(String),
    /// Engine index (1-based; the x series is 0).
    Index(usize),
    /// Position among the y series.
    ZeroIndex(usize),
}

impl SeriesFocusTarget {
    #[must_use]
    pub fn matches(&self, series_idx: usize, label: Option<&str>) -> bool {
        match self {
            Self::Label(target) => label == Some(target.as_str()),
            Self::Index(index) => *index == series_idx,
            Self::ZeroIndex(zero_index) => series_idx >= 1 && *zero_index == series_idx - 1,
        }
    }
}

/// Published while at least one series is focused; absent otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSeriesMessage {
    pub source_id: ChartId,
    pub targets: Vec<SeriesFocusTarget>,
}

impl FocusSeriesMessage {
    #[must_use]
    pub fn is_focused(&self, series_idx: usize, label: Option<&str>) -> bool {
        self.targets
            .iter()
            .any(|target| target.matches(series_idx, label))
    }
}

pub struct FocusSeriesKey;

impl BusKey for FocusSeriesKey {
    const NAME: &'static str = "focusSeries";
    type Message = FocusSeriesMessage;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusSeriesOptions {
    /// Maximum vertical distance between cursor and series point.
    pub px_threshold: f64,
    pub unfocused_alpha: f64,
    pub focused_alpha: f64,
    /// Rebuild series paths on redraw instead of reusing cached ones.
    pub rebuild_paths: bool,
}

impl Default for FocusSeriesOptions {
    fn default() -> Self {
        Self {
            px_threshold: DEFAULT_PX_THRESHOLD,
            unfocused_alpha: DEFAULT_UNFOCUSED_ALPHA,
            focused_alpha: DEFAULT_FOCUSED_ALPHA,
            rebuild_paths: false,
        }
    }
}

impl FocusSeriesOptions {
    #[must_use]
    pub fn with_px_threshold(mut self, px_threshold: f64) -> Self {
        self.px_threshold = px_threshold;
        self
    }

    #[must_use]
    pub fn with_alphas(mut self, focused_alpha: f64, unfocused_alpha: f64) -> Self {
        self.focused_alpha = focused_alpha;
        self.unfocused_alpha = unfocused_alpha;
        self
    }

    #[must_use]
    pub fn with_rebuild_paths(mut self, rebuild_paths: bool) -> Self {
        self.rebuild_paths = rebuild_paths;
        self
    }
}

/// Series whose drawn point at the cursor index lies within `px_threshold`
/// pixels of the cursor, vertically.
///
/// Hidden series and gaps are skipped. Ties are all included; order is
/// ascending engine index.
#[must_use]
pub fn focus_targets(
    chart: &dyn ChartHandle,
    cursor: &CursorSnapshot,
    px_threshold: f64,
) -> Vec<SeriesFocusTarget> {
    chart
        .series()
        .into_iter()
        .enumerate()
        .skip(1)
        .filter(|(_, series)| series.show)
        .filter_map(|(series_idx, series)| {
            let value = chart.value(series_idx, cursor.idx)?;
            let scale = series.scale.as_deref().unwrap_or(DEFAULT_Y_SCALE);
            let y_pos = match chart.value_to_pos(value, scale) {
                Ok(y_pos) => y_pos,
                Err(err) => {
                    trace!(series_idx, error = %err, "skip series without pixel position");
                    return None;
                }
            };
            if (y_pos - cursor.position.top).abs() > px_threshold {
                return None;
            }
            Some(match series.label {
                Some(label) => SeriesFocusTarget::Label(label),
                None => SeriesFocusTarget::Index(series_idx),
            })
        })
        .collect()
}

/// Sets series alpha from `targets` and requests a redraw if anything changed.
///
/// No targets (absent or empty) restores full alpha on every series.
pub fn apply_series_focus(
    chart: &dyn ChartHandle,
    targets: Option<&[SeriesFocusTarget]>,
    options: &FocusSeriesOptions,
) {
    let targets = targets.filter(|targets| !targets.is_empty());
    let mut changed = false;

    for (series_idx, series) in chart.series().into_iter().enumerate().skip(1) {
        let alpha = match targets {
            None => 1.0,
            Some(targets) => {
                let focused = targets
                    .iter()
                    .any(|target| target.matches(series_idx, series.label.as_deref()));
                if focused {
                    options.focused_alpha
                } else {
                    options.unfocused_alpha
                }
            }
        };
        if series.alpha != alpha {
            chart.set_series_alpha(series_idx, alpha);
            changed = true;
        }
    }

    if changed {
        chart.redraw(options.rebuild_paths);
    }
}

/// Focus-series plugin factory.
///
/// Requires the cursor plugin's bus slot; warns and does nothing otherwise.
#[must_use]
pub fn focus_series(options: FocusSeriesOptions) -> PluginSpec {
    PluginSpec::factory(move |ctx: &PluginFactoryContext| {
        let Some(bus) = require_bus(ctx, FOCUS_SERIES_PLUGIN_ID) else {
            return Box::new(NoopPlugin::new(FOCUS_SERIES_PLUGIN_ID));
        };
        if !bus.contains::<CursorKey>() {
            warn!(
                plugin = FOCUS_SERIES_PLUGIN_ID,
                "cursor bus state missing; register the cursor plugin first"
            );
            return Box::new(NoopPlugin::new(FOCUS_SERIES_PLUGIN_ID));
        }
        Box::new(FocusSeriesPlugin::new(bus, ctx.tasks.clone(), options))
    })
}

#[derive(Debug)]
pub struct FocusSeriesPlugin {
    bus: PluginBus,
    tasks: TaskQueue,
    options: FocusSeriesOptions,
    effect: Option<Subscription>,
    leave_listener: Option<ListenerId>,
    alive: Rc<Cell<bool>>,
}

impl FocusSeriesPlugin {
    #[must_use]
    pub fn new(bus: PluginBus, tasks: TaskQueue, options: FocusSeriesOptions) -> Self {
        Self {
            bus,
            tasks,
            options,
            effect: None,
            leave_listener: None,
            alive: Rc::new(Cell::new(false)),
        }
    }

    #[must_use]
    pub fn options(&self) -> FocusSeriesOptions {
        self.options
    }

    /// Applies focus already on the bus at mount time, once.
    fn queue_initial_reconcile(&self, chart: Weak<dyn ChartHandle>) {
        let bus = self.bus.clone();
        let alive = Rc::clone(&self.alive);
        let options = self.options;
        self.tasks.queue_microtask(move || {
            if !alive.get() {
                return;
            }
            let Some(chart) = chart.upgrade() else {
                return;
            };
            if let Some(focus) = bus.read::<FocusSeriesKey>() {
                debug!(chart = %chart.id(), targets = focus.targets.len(), "apply seeded focus");
                apply_series_focus(chart.as_ref(), Some(focus.targets.as_slice()), &options);
            }
        });
    }

    /// Mirrors published focus on every chart that is not the cursor source.
    fn mirror_effect(&self, chart: Weak<dyn ChartHandle>) -> Subscription {
        let options = self.options;
        self.bus.create_effect(move |bus| {
            let source = bus.select::<CursorKey, _>(&[CursorKey::SOURCE_FIELD], |message| {
                message.source_id.clone()
            });
            let focus = bus.read::<FocusSeriesKey>();
            let Some(chart) = chart.upgrade() else {
                return;
            };
            if source.as_ref() == Some(chart.id()) {
                return;
            }
            apply_series_focus(
                chart.as_ref(),
                focus.as_ref().map(|focus| focus.targets.as_slice()),
                &options,
            );
        })
    }
}

impl ChartPlugin for FocusSeriesPlugin {
    fn id(&self) -> &str {
        FOCUS_SERIES_PLUGIN_ID
    }

    fn ready(&mut self, chart: &ChartRef) {
        self.alive.set(true);
        self.queue_initial_reconcile(Rc::downgrade(chart));

        let bus = self.bus.clone();
        let weak = Rc::downgrade(chart);
        let options = self.options;
        self.leave_listener = Some(chart.surface().add_listener(
            PointerEventKind::Leave,
            Rc::new(move |_| {
                bus.set::<FocusSeriesKey>(None);
                if let Some(chart) = weak.upgrade() {
                    apply_series_focus(chart.as_ref(), None, &options);
                }
            }),
        ));

        self.effect = Some(self.mirror_effect(Rc::downgrade(chart)));
        debug!(chart = %chart.id(), "focus-series plugin attached");
    }

    fn set_cursor(&mut self, chart: &ChartRef) {
        let Some(cursor) = self.bus.read::<CursorKey>() else {
            return;
        };
        if !cursor.is_source(chart.id()) {
            return;
        }
        let Some(snapshot) = cursor
            .snapshot(chart.id().as_str())
            .filter(|snapshot| snapshot.is_within(chart.as_ref()))
        else {
            return;
        };

        let targets = focus_targets(chart.as_ref(), snapshot, self.options.px_threshold);
        trace!(chart = %chart.id(), idx = snapshot.idx, targets = targets.len(), "focus recomputed");
        apply_series_focus(chart.as_ref(), Some(targets.as_slice()), &self.options);

        let message = (!targets.is_empty()).then(|| FocusSeriesMessage {
            source_id: chart.id().clone(),
            targets,
        });
        self.bus.set::<FocusSeriesKey>(message);
    }

    fn destroy(&mut self, chart: &ChartRef) {
        self.alive.set(false);
        self.effect = None;
        if let Some(listener) = self.leave_listener.take() {
            chart.surface().remove_listener(listener);
        }
    }
}
