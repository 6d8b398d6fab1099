use std::rc::Rc;

use crate::core::{ChartId, Rect, SeriesConfig, ViewportMetrics};
use crate::error::PluginResult;
use crate::interaction::{CursorState, PointerSurface};

/// Contract a charting engine instance exposes to plugins.
///
/// Handles are shared (`Rc`) between the host, plugin hooks, pointer
/// listeners, and bus effects, so every method takes `&self` and engines use
/// interior mutability for the few mutating operations.
pub trait ChartHandle {
    fn id(&self) -> &ChartId;

    /// Series configuration; index 0 is the x series.
    fn series(&self) -> Vec<SeriesConfig>;

    fn set_series_alpha(&self, series_idx: usize, alpha: f64);

    /// Length of the x series of the aligned data matrix.
    fn data_len(&self) -> usize;

    /// Value of `series_idx` at `idx`; `None` for gaps and out-of-range reads.
    fn value(&self, series_idx: usize, idx: usize) -> Option<f64>;

    fn cursor(&self) -> CursorState;

    /// Converts `value` on `scale` into a plotting-area-relative pixel offset.
    fn value_to_pos(&self, value: f64, scale: &str) -> PluginResult<f64>;

    /// Requests a redraw; `rebuild_paths == false` reuses cached series paths.
    fn redraw(&self, rebuild_paths: bool);

    /// Plotting area bounding box, relative to the viewport.
    fn plot_rect(&self) -> Rect;

    fn viewport(&self) -> ViewportMetrics;

    fn surface(&self) -> &PointerSurface;
}

pub type ChartRef = Rc<dyn ChartHandle>;
