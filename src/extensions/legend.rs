use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bus::{PluginBus, Subscription};
use crate::core::{ChartHandle, ChartRef, Rect, SeriesDataOptions, SeriesDatum, series_data};
use crate::extensions::plugins::{
    ChartPlugin, NoopPlugin, PluginFactoryContext, PluginSpec, require_bus,
};

pub const LEGEND_PLUGIN_ID: &str = "legend";
pub const DEFAULT_LEGEND_OFFSET: f64 = 8.0;
pub const DEFAULT_LEGEND_Z_INDEX: i32 = 10;
pub const DEFAULT_LEGEND_ROOT_ID: &str = "chart-legend-root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegendPlacement {
    #[default]
    TopLeft,
    TopRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendOptions {
    pub placement: LegendPlacement,
    pub px_offset: f64,
    pub z_index: i32,
    pub id: String,
    pub class: Option<String>,
}

impl Default for LegendOptions {
    fn default() -> Self {
        Self {
            placement: LegendPlacement::default(),
            px_offset: DEFAULT_LEGEND_OFFSET,
            z_index: DEFAULT_LEGEND_Z_INDEX,
            id: DEFAULT_LEGEND_ROOT_ID.to_owned(),
            class: None,
        }
    }
}

impl LegendOptions {
    #[must_use]
    pub fn with_placement(mut self, placement: LegendPlacement) -> Self {
        self.placement = placement;
        self
    }

    #[must_use]
    pub fn with_px_offset(mut self, px_offset: f64) -> Self {
        self.px_offset = px_offset;
        self
    }

    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

/// Container geometry relative to the plotting area's top-left corner.
///
/// Exactly one of `left`/`right` is set, matching the placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegendLayout {
    pub top: f64,
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub max_width: f64,
    pub max_height: f64,
    /// Content larger than the max box scrolls instead of overflowing.
    pub scrollable: bool,
}

/// Pins the legend to a top corner of `plot` and bounds it by the plot box
/// minus the offset on both sides.
#[must_use]
pub fn legend_layout(plot: Rect, options: &LegendOptions) -> LegendLayout {
    let offset = options.px_offset;
    let (left, right) = match options.placement {
        LegendPlacement::TopLeft => (Some(offset), None),
        LegendPlacement::TopRight => (None, Some(offset)),
    };

    LegendLayout {
        top: offset,
        left,
        right,
        max_width: (plot.width - 2.0 * offset).max(0.0),
        max_height: (plot.height - 2.0 * offset).max(0.0),
        scrollable: true,
    }
}

pub struct LegendProps<'a> {
    pub chart: &'a ChartRef,
    pub series: &'a [SeriesDatum],
    /// Reads made through this bus re-render the legend when they change.
    pub bus: &'a PluginBus,
}

pub trait LegendContent {
    type View: Clone + 'static;

    fn render(&self, props: &LegendProps<'_>) -> Self::View;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendOverlay<V> {
    pub id: String,
    pub class: Option<String>,
    pub view: V,
    pub layout: LegendLayout,
    pub z_index: i32,
}

pub struct LegendHandle<V> {
    overlay: Rc<RefCell<Option<LegendOverlay<V>>>>,
}

impl<V> Clone for LegendHandle<V> {
    fn clone(&self) -> Self {
        Self {
            overlay: Rc::clone(&self.overlay),
        }
    }
}

impl<V: Clone> LegendHandle<V> {
    #[must_use]
    pub fn current(&self) -> Option<LegendOverlay<V>> {
        self.overlay.borrow().clone()
    }

    #[must_use]
    pub fn layout(&self) -> Option<LegendLayout> {
        self.overlay.borrow().as_ref().map(|overlay| overlay.layout)
    }
}

impl<V> fmt::Debug for LegendHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegendHandle")
            .field("mounted", &self.overlay.borrow().is_some())
            .finish()
    }
}

/// Legend plugin factory. Needs a bus but no particular bus key.
pub fn legend<C>(content: C, options: LegendOptions) -> (PluginSpec, LegendHandle<C::View>)
where
    C: LegendContent + 'static,
{
    let handle = LegendHandle {
        overlay: Rc::new(RefCell::new(None)),
    };
    let content = Rc::new(content);
    let shared = handle.clone();

    let spec = PluginSpec::factory(move |ctx: &PluginFactoryContext| {
        let Some(bus) = require_bus(ctx, LEGEND_PLUGIN_ID) else {
            return Box::new(NoopPlugin::new(LEGEND_PLUGIN_ID));
        };
        Box::new(LegendPlugin {
            bus,
            content: Rc::clone(&content),
            options: options.clone(),
            overlay: shared.clone(),
            effect: None,
        })
    });

    (spec, handle)
}

pub struct LegendPlugin<C: LegendContent> {
    bus: PluginBus,
    content: Rc<C>,
    options: LegendOptions,
    overlay: LegendHandle<C::View>,
    effect: Option<Subscription>,
}

impl<C: LegendContent + 'static> LegendPlugin<C> {
    fn mount(&mut self, chart: &ChartRef) {
        let chart: Weak<dyn ChartHandle> = Rc::downgrade(chart);
        let content = Rc::clone(&self.content);
        let options = self.options.clone();
        let overlay = self.overlay.clone();

        self.effect = Some(self.bus.create_effect(move |bus| {
            let Some(chart) = chart.upgrade() else {
                return;
            };
            let series = series_data(chart.as_ref(), &SeriesDataOptions::default());
            let view = content.render(&LegendProps {
                chart: &chart,
                series: &series,
                bus,
            });
            *overlay.overlay.borrow_mut() = Some(LegendOverlay {
                id: options.id.clone(),
                class: options.class.clone(),
                view,
                layout: legend_layout(chart.plot_rect(), &options),
                z_index: options.z_index,
            });
        }));
    }
}

impl<C: LegendContent + 'static> ChartPlugin for LegendPlugin<C> {
    fn id(&self) -> &str {
        LEGEND_PLUGIN_ID
    }

    fn ready(&mut self, chart: &ChartRef) {
        self.mount(chart);
        debug!(chart = %chart.id(), "legend plugin attached");
    }

    fn set_data(&mut self, chart: &ChartRef) {
        self.mount(chart);
    }

    fn set_size(&mut self, chart: &ChartRef) {
        let layout = legend_layout(chart.plot_rect(), &self.options);
        if let Some(overlay) = self.overlay.overlay.borrow_mut().as_mut() {
            overlay.layout = layout;
        }
    }

    fn destroy(&mut self, _chart: &ChartRef) {
        self.effect = None;
        *self.overlay.overlay.borrow_mut() = None;
    }
}
