use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::bus::{PluginBus, Subscription};
use crate::core::{
    ChartHandle, ChartRef, Position, SeriesDataOptions, SeriesDatum, Size, ViewportMetrics,
    series_data,
};
use crate::extensions::cursor::{CursorKey, CursorSnapshot, cursor_snapshot};
use crate::extensions::focus_series::{FocusSeriesKey, FocusSeriesMessage};
use crate::extensions::plugins::{
    ChartPlugin, NoopPlugin, PluginFactoryContext, PluginSpec, require_bus,
};

pub const TOOLTIP_PLUGIN_ID: &str = "tooltip";
pub const DEFAULT_TOOLTIP_OFFSET: f64 = 8.0;
pub const DEFAULT_TOOLTIP_Z_INDEX: i32 = 20;
pub const DEFAULT_TOOLTIP_ROOT_ID: &str = "chart-tooltip-root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalSide {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalSide {
    Left,
    Right,
}

/// Corner of the cursor the tooltip box is placed toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TooltipPlacement {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl TooltipPlacement {
    #[must_use]
    pub const fn from_sides(vertical: VerticalSide, horizontal: HorizontalSide) -> Self {
        match (vertical, horizontal) {
            (VerticalSide::Top, HorizontalSide::Left) => Self::TopLeft,
            (VerticalSide::Top, HorizontalSide::Right) => Self::TopRight,
            (VerticalSide::Bottom, HorizontalSide::Left) => Self::BottomLeft,
            (VerticalSide::Bottom, HorizontalSide::Right) => Self::BottomRight,
        }
    }

    #[must_use]
    pub const fn vertical(self) -> VerticalSide {
        match self {
            Self::TopLeft | Self::TopRight => VerticalSide::Top,
            Self::BottomLeft | Self::BottomRight => VerticalSide::Bottom,
        }
    }

    #[must_use]
    pub const fn horizontal(self) -> HorizontalSide {
        match self {
            Self::TopLeft | Self::BottomLeft => HorizontalSide::Left,
            Self::TopRight | Self::BottomRight => HorizontalSide::Right,
        }
    }
}

impl VerticalSide {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }
}

impl HorizontalSide {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Coordinate space of the computed tooltip position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TooltipMode {
    /// Viewport-relative (`position: fixed`).
    Fixed,
    /// Document-relative (`position: absolute`); includes scroll offsets.
    #[default]
    Absolute,
}

/// Inputs of one placement computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRequest {
    /// Cursor position in the coordinate space of `mode`.
    pub anchor: Position,
    pub size: Size,
    pub viewport: ViewportMetrics,
    pub placement: TooltipPlacement,
    pub mode: TooltipMode,
    pub offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPlacement {
    pub position: Position,
    /// Placement after flips.
    pub placement: TooltipPlacement,
    pub flipped_x: bool,
    pub flipped_y: bool,
}

fn horizontal_coordinate(anchor: f64, width: f64, side: HorizontalSide, offset: f64) -> f64 {
    match side {
        HorizontalSide::Right => anchor + offset,
        HorizontalSide::Left => anchor - width - offset,
    }
}

fn vertical_coordinate(anchor: f64, height: f64, side: VerticalSide, offset: f64) -> f64 {
    match side {
        VerticalSide::Bottom => anchor + offset,
        VerticalSide::Top => anchor - height - offset,
    }
}

fn overflows_x(left: f64, width: f64, side: HorizontalSide, viewport_width: f64) -> bool {
    match side {
        HorizontalSide::Right => left + width > viewport_width,
        HorizontalSide::Left => left < 0.0,
    }
}

fn overflows_y(top: f64, height: f64, side: VerticalSide, viewport_height: f64) -> bool {
    match side {
        VerticalSide::Bottom => top + height > viewport_height,
        VerticalSide::Top => top < 0.0,
    }
}

/// Places a box of `size` at the preferred corner of `anchor`, flipping each
/// axis independently when it would leave the viewport.
///
/// A flipped axis is not re-checked; if neither side fits, the flipped side
/// wins.
#[must_use]
pub fn resolve_tooltip_position(request: &PlacementRequest) -> ResolvedPlacement {
    let (scroll_x, scroll_y) = match request.mode {
        TooltipMode::Fixed => (0.0, 0.0),
        TooltipMode::Absolute => (request.viewport.scroll_x, request.viewport.scroll_y),
    };
    let Size { width, height } = request.size;

    let mut horizontal = request.placement.horizontal();
    let mut left = horizontal_coordinate(request.anchor.left, width, horizontal, request.offset);
    let flipped_x = overflows_x(left - scroll_x, width, horizontal, request.viewport.width);
    if flipped_x {
        horizontal = horizontal.opposite();
        left = horizontal_coordinate(request.anchor.left, width, horizontal, request.offset);
    }

    let mut vertical = request.placement.vertical();
    let mut top = vertical_coordinate(request.anchor.top, height, vertical, request.offset);
    let flipped_y = overflows_y(top - scroll_y, height, vertical, request.viewport.height);
    if flipped_y {
        vertical = vertical.opposite();
        top = vertical_coordinate(request.anchor.top, height, vertical, request.offset);
    }

    ResolvedPlacement {
        position: Position::new(left, top),
        placement: TooltipPlacement::from_sides(vertical, horizontal),
        flipped_x,
        flipped_y,
    }
}

/// Caller hook that may adjust the final position (clamp, nudge, snap).
pub type PositionAdjust = Rc<dyn Fn(Position, &PositionContext<'_>) -> Position>;

pub struct PositionContext<'a> {
    pub chart: &'a ChartRef,
    pub cursor: &'a CursorSnapshot,
    pub resolved: ResolvedPlacement,
    pub size: Size,
    pub viewport: ViewportMetrics,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TooltipOptions {
    pub placement: TooltipPlacement,
    pub mode: TooltipMode,
    pub offset: f64,
    pub z_index: i32,
    pub id: String,
    pub class: Option<String>,
    #[serde(skip)]
    pub adjust_position: Option<PositionAdjust>,
}

impl Default for TooltipOptions {
    fn default() -> Self {
        Self {
            placement: TooltipPlacement::default(),
            mode: TooltipMode::default(),
            offset: DEFAULT_TOOLTIP_OFFSET,
            z_index: DEFAULT_TOOLTIP_Z_INDEX,
            id: DEFAULT_TOOLTIP_ROOT_ID.to_owned(),
            class: None,
            adjust_position: None,
        }
    }
}

impl TooltipOptions {
    #[must_use]
    pub fn with_placement(mut self, placement: TooltipPlacement) -> Self {
        self.placement = placement;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: TooltipMode) -> Self {
        self.mode = mode;
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

    #[must_use]
    pub fn with_adjust_position(
        mut self,
        adjust: impl Fn(Position, &PositionContext<'_>) -> Position + 'static,
    ) -> Self {
        self.adjust_position = Some(Rc::new(adjust));
        self
    }
}

impl fmt::Debug for TooltipOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TooltipOptions")
            .field("placement", &self.placement)
            .field("mode", &self.mode)
            .field("offset", &self.offset)
            .field("z_index", &self.z_index)
            .field("id", &self.id)
            .field("class", &self.class)
            .field("adjust_position", &self.adjust_position.is_some())
            .finish()
    }
}

pub struct TooltipProps<'a> {
    pub chart: &'a ChartRef,
    pub cursor: &'a CursorSnapshot,
    pub series: &'a [SeriesDatum],
    pub focus: Option<&'a FocusSeriesMessage>,
}

/// Caller-supplied tooltip body.
pub trait TooltipContent {
    type View: Clone + 'static;

    fn render(&self, props: &TooltipProps<'_>) -> Self::View;

    /// Rendered box size, used for placement.
    fn measure(&self, view: &Self::View) -> Size;
}

/// Mounted tooltip: the rendered view plus where to put it.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipOverlay<V> {
    pub id: String,
    pub class: Option<String>,
    pub view: V,
    pub position: Position,
    pub placement: TooltipPlacement,
    pub mode: TooltipMode,
    pub z_index: i32,
}

/// Read side of a tooltip: `None` while nothing is mounted.
pub struct TooltipHandle<V> {
    overlay: Rc<RefCell<Option<TooltipOverlay<V>>>>,
}

impl<V> Clone for TooltipHandle<V> {
    fn clone(&self) -> Self {
        Self {
            overlay: Rc::clone(&self.overlay),
        }
    }
}

impl<V: Clone> TooltipHandle<V> {
    #[must_use]
    pub fn current(&self) -> Option<TooltipOverlay<V>> {
        self.overlay.borrow().clone()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.overlay.borrow().is_some()
    }
}

impl<V> fmt::Debug for TooltipHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TooltipHandle")
            .field("mounted", &self.overlay.borrow().is_some())
            .finish()
    }
}

/// Tooltip plugin factory.
///
/// Returns the [`PluginSpec`] and the handle the host reads the mounted overlay
/// from. Requires the cursor plugin's bus slot.
pub fn tooltip<C>(content: C, options: TooltipOptions) -> (PluginSpec, TooltipHandle<C::View>)
where
    C: TooltipContent + 'static,
{
    let handle = TooltipHandle {
        overlay: Rc::new(RefCell::new(None)),
    };
    let content = Rc::new(content);
    let shared = handle.clone();

    let spec = PluginSpec::factory(move |ctx: &PluginFactoryContext| {
        let Some(bus) = require_bus(ctx, TOOLTIP_PLUGIN_ID) else {
            return Box::new(NoopPlugin::new(TOOLTIP_PLUGIN_ID));
        };
        if !bus.contains::<CursorKey>() {
            warn!(
                plugin = TOOLTIP_PLUGIN_ID,
                "cursor bus state missing; register the cursor plugin first"
            );
            return Box::new(NoopPlugin::new(TOOLTIP_PLUGIN_ID));
        }
        Box::new(TooltipPlugin {
            bus,
            content: Rc::clone(&content),
            options: options.clone(),
            overlay: shared.clone(),
            effect: None,
            engaged: Rc::new(Cell::new(false)),
        })
    });

    (spec, handle)
}

pub struct TooltipPlugin<C: TooltipContent> {
    bus: PluginBus,
    content: Rc<C>,
    options: TooltipOptions,
    overlay: TooltipHandle<C::View>,
    effect: Option<Subscription>,
    /// Whether the engine currently reports a cursor inside the data. The
    /// bus slice outlives the pointer, so this gates mounting.
    engaged: Rc<Cell<bool>>,
}

impl<C: TooltipContent + 'static> TooltipPlugin<C> {
    fn refresh(&mut self, chart: &ChartRef) {
        // Re-creating the effect re-reads bus state and re-tracks it.
        self.effect = Some(self.render_effect(Rc::downgrade(chart)));
    }

    fn render_effect(&self, chart: Weak<dyn ChartHandle>) -> Subscription {
        let content = Rc::clone(&self.content);
        let options = self.options.clone();
        let overlay = self.overlay.clone();
        let engaged = Rc::clone(&self.engaged);

        self.bus.create_effect(move |bus| {
            let Some(chart) = chart.upgrade() else {
                return;
            };
            let chart_id = chart.id().clone();
            let snapshot = bus.select::<CursorKey, _>(
                &[CursorKey::STATE_FIELD, chart_id.as_str()],
                |message| message.snapshot(chart_id.as_str()).cloned(),
            );
            let focus = bus.read::<FocusSeriesKey>();

            let next = snapshot
                .filter(|snapshot| {
                    engaged.get() && snapshot.visible && snapshot.is_within(chart.as_ref())
                })
                .map(|snapshot| {
                    mount_overlay(&chart, &snapshot, focus.as_ref(), content.as_ref(), &options)
                });
            if next.is_none() {
                trace!(chart = %chart_id, "tooltip idle");
            }
            *overlay.overlay.borrow_mut() = next;
        })
    }
}

fn mount_overlay<C: TooltipContent>(
    chart: &ChartRef,
    snapshot: &CursorSnapshot,
    focus: Option<&FocusSeriesMessage>,
    content: &C,
    options: &TooltipOptions,
) -> TooltipOverlay<C::View> {
    let series = series_data(chart.as_ref(), &SeriesDataOptions::default());
    let view = content.render(&TooltipProps {
        chart,
        cursor: snapshot,
        series: &series,
        focus,
    });
    let size = content.measure(&view);
    let viewport = chart.viewport();
    let plot = chart.plot_rect();

    let mut anchor = plot.origin().offset(snapshot.position.left, snapshot.position.top);
    if options.mode == TooltipMode::Absolute {
        anchor = anchor.offset(viewport.scroll_x, viewport.scroll_y);
    }

    let resolved = resolve_tooltip_position(&PlacementRequest {
        anchor,
        size,
        viewport,
        placement: options.placement,
        mode: options.mode,
        offset: options.offset,
    });
    let position = match &options.adjust_position {
        Some(adjust) => adjust(
            resolved.position,
            &PositionContext {
                chart,
                cursor: snapshot,
                resolved,
                size,
                viewport,
            },
        ),
        None => resolved.position,
    };

    TooltipOverlay {
        id: options.id.clone(),
        class: options.class.clone(),
        view,
        position,
        placement: resolved.placement,
        mode: options.mode,
        z_index: options.z_index,
    }
}

impl<C: TooltipContent + 'static> ChartPlugin for TooltipPlugin<C> {
    fn id(&self) -> &str {
        TOOLTIP_PLUGIN_ID
    }

    fn ready(&mut self, chart: &ChartRef) {
        self.engaged.set(cursor_snapshot(chart.as_ref()).is_some());
        self.refresh(chart);
        debug!(chart = %chart.id(), "tooltip plugin attached");
    }

    fn set_cursor(&mut self, chart: &ChartRef) {
        let engaged = cursor_snapshot(chart.as_ref()).is_some();
        if engaged == self.engaged.get() {
            return;
        }
        trace!(chart = %chart.id(), engaged, "tooltip cursor engagement changed");
        self.engaged.set(engaged);
        self.refresh(chart);
    }

    fn set_data(&mut self, chart: &ChartRef) {
        self.refresh(chart);
    }

    fn set_size(&mut self, chart: &ChartRef) {
        self.refresh(chart);
    }

    fn destroy(&mut self, _chart: &ChartRef) {
        self.effect = None;
        *self.overlay.overlay.borrow_mut() = None;
    }
}
