//! Chart plugins and the hook set they implement.
//!
//! Plugins that share state do it through a [`crate::bus::PluginBus`]; none of
//! them holds a reference to another.

pub mod cursor;
pub mod cursor_move;
pub mod focus_series;
pub mod legend;
pub mod plugins;
pub mod tooltip;

pub use cursor::{
    CURSOR_PLUGIN_ID, CursorKey, CursorMessage, CursorPatch, CursorPhase, CursorPlugin,
    CursorSnapshot, cursor, cursor_snapshot,
};
pub use cursor_move::{CURSOR_MOVE_PLUGIN_ID, CursorMoveCallback, CursorMoveParams, CursorMovePlugin};
pub use focus_series::{
    FOCUS_SERIES_PLUGIN_ID, FocusSeriesKey, FocusSeriesMessage, FocusSeriesOptions,
    FocusSeriesPlugin, SeriesFocusTarget, apply_series_focus, focus_series, focus_targets,
};
pub use legend::{
    LEGEND_PLUGIN_ID, LegendContent, LegendHandle, LegendLayout, LegendOptions, LegendOverlay,
    LegendPlacement, LegendProps, legend, legend_layout,
};
pub use plugins::{
    ChartPlugin, NoopPlugin, PluginFactory, PluginFactoryContext, PluginSpec, resolve_plugins,
};
pub use tooltip::{
    HorizontalSide, PlacementRequest, PositionAdjust, PositionContext, ResolvedPlacement,
    TOOLTIP_PLUGIN_ID, TooltipContent, TooltipHandle, TooltipMode, TooltipOptions,
    TooltipOverlay, TooltipPlacement, TooltipProps, VerticalSide, tooltip,
    resolve_tooltip_position,
};
