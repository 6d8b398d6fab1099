use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::core::{
    ChartHandle, ChartId, LinearScale, Rect, ScaleOrientation, SeriesConfig, ViewportMetrics,
};
use crate::error::{PluginError, PluginResult};
use crate::interaction::{CursorState, PointerSurface};

/// Aligned data matrix: column 0 is the x series, then one column per y series.
pub type AlignedData = Vec<Vec<Option<f64>>>;

pub const DEFAULT_Y_SCALE: &str = "y";

/// In-memory chart engine with no drawing backend.
///
/// Used by tests and headless hosts. It keeps the same observable surface a
/// real engine exposes to plugins and records redraw requests.
#[derive(Debug)]
pub struct HeadlessChart {
    id: ChartId,
    series: RefCell<Vec<SeriesConfig>>,
    data: RefCell<AlignedData>,
    scales: RefCell<IndexMap<String, LinearScale>>,
    cursor: Cell<CursorState>,
    plot_rect: Cell<Rect>,
    viewport: Cell<ViewportMetrics>,
    surface: PointerSurface,
    redraws: RefCell<Vec<bool>>,
}

#[derive(Debug, Clone)]
pub struct HeadlessChartBuilder {
    id: ChartId,
    series: Vec<SeriesConfig>,
    data: AlignedData,
    scales: IndexMap<String, LinearScale>,
    plot_rect: Rect,
    viewport: ViewportMetrics,
}

impl HeadlessChartBuilder {
    #[must_use]
    pub fn series(mut self, series: SeriesConfig) -> Self {
        self.series.push(series);
        self
    }

    #[must_use]
    pub fn data(mut self, data: AlignedData) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn scale(mut self, name: impl Into<String>, scale: LinearScale) -> Self {
        self.scales.insert(name.into(), scale);
        self
    }

    #[must_use]
    pub fn plot_rect(mut self, rect: Rect) -> Self {
        self.plot_rect = rect;
        self
    }

    #[must_use]
    pub fn viewport(mut self, viewport: ViewportMetrics) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn build(self) -> PluginResult<Rc<HeadlessChart>> {
        let plot_rect = self.plot_rect.validate()?;
        let mut series = self.series;
        if series.is_empty() {
            series.push(SeriesConfig::default());
        }
        validate_aligned(&self.data, series.len())?;

        debug!(
            chart = %self.id,
            series = series.len(),
            "build headless chart"
        );
        Ok(Rc::new(HeadlessChart {
            id: self.id,
            series: RefCell::new(series),
            data: RefCell::new(self.data),
            scales: RefCell::new(self.scales),
            cursor: Cell::new(CursorState::default()),
            plot_rect: Cell::new(plot_rect),
            viewport: Cell::new(self.viewport),
            surface: PointerSurface::new(),
            redraws: RefCell::new(Vec::new()),
        }))
    }
}

fn validate_aligned(data: &AlignedData, series_len: usize) -> PluginResult<()> {
    if data.is_empty() {
        return Ok(());
    }
    if data.len() != series_len {
        return Err(PluginError::InvalidData(format!(
            "aligned data has {} columns but chart has {series_len} series",
            data.len()
        )));
    }
    let x_len = data[0].len();
    if let Some(column) = data.iter().position(|column| column.len() != x_len) {
        return Err(PluginError::InvalidData(format!(
            "column {column} length does not match x series length {x_len}"
        )));
    }
    if data[0].iter().any(Option::is_none) {
        return Err(PluginError::InvalidData(
            "x series must not contain gaps".to_owned(),
        ));
    }
    Ok(())
}

impl HeadlessChart {
    #[must_use]
    pub fn builder(id: impl Into<ChartId>) -> HeadlessChartBuilder {
        HeadlessChartBuilder {
            id: id.into(),
            series: Vec::new(),
            data: Vec::new(),
            scales: IndexMap::new(),
            plot_rect: Rect::new(0.0, 0.0, 600.0, 300.0),
            viewport: ViewportMetrics::new(1280.0, 800.0),
        }
    }

    pub fn set_cursor(&self, cursor: CursorState) {
        self.cursor.set(cursor);
    }

    /// Pointer surface, for simulating enter/leave in headless setups.
    #[must_use]
    pub fn surface(&self) -> &PointerSurface {
        &self.surface
    }

    pub fn set_data(&self, data: AlignedData) -> PluginResult<()> {
        validate_aligned(&data, self.series.borrow().len())?;
        *self.data.borrow_mut() = data;
        Ok(())
    }

    pub fn set_plot_rect(&self, rect: Rect) -> PluginResult<()> {
        self.plot_rect.set(rect.validate()?);
        Ok(())
    }

    pub fn set_viewport(&self, viewport: ViewportMetrics) {
        self.viewport.set(viewport);
    }

    pub fn set_scale(&self, name: impl Into<String>, scale: LinearScale) {
        self.scales.borrow_mut().insert(name.into(), scale);
    }

    /// Toggles visibility. Returns `false` for an unknown series.
    pub fn set_series_show(&self, series_idx: usize, show: bool) -> bool {
        match self.series.borrow_mut().get_mut(series_idx) {
            Some(series) => {
                series.show = show;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn series_alpha(&self, series_idx: usize) -> Option<f64> {
        self.series.borrow().get(series_idx).map(|series| series.alpha)
    }

    #[must_use]
    pub fn redraw_count(&self) -> usize {
        self.redraws.borrow().len()
    }

    /// Path-rebuild flag of the most recent redraw request.
    #[must_use]
    pub fn last_redraw(&self) -> Option<bool> {
        self.redraws.borrow().last().copied()
    }
}

impl ChartHandle for HeadlessChart {
    fn id(&self) -> &ChartId {
        &self.id
    }

    fn series(&self) -> Vec<SeriesConfig> {
        self.series.borrow().clone()
    }

    fn set_series_alpha(&self, series_idx: usize, alpha: f64) {
        if let Some(series) = self.series.borrow_mut().get_mut(series_idx) {
            series.alpha = alpha;
        }
    }

    fn data_len(&self) -> usize {
        self.data.borrow().first().map_or(0, Vec::len)
    }

    fn value(&self, series_idx: usize, idx: usize) -> Option<f64> {
        self.data
            .borrow()
            .get(series_idx)
            .and_then(|column| column.get(idx).copied().flatten())
    }

    fn cursor(&self) -> CursorState {
        self.cursor.get()
    }

    fn value_to_pos(&self, value: f64, scale: &str) -> PluginResult<f64> {
        let scale = self
            .scales
            .borrow()
            .get(scale)
            .copied()
            .ok_or_else(|| PluginError::UnknownScale(scale.to_owned()))?;
        let rect = self.plot_rect.get();
        let extent = match scale.orientation() {
            ScaleOrientation::Horizontal => rect.width,
            ScaleOrientation::Vertical => rect.height,
        };
        scale.domain_to_pixel(value, extent)
    }

    fn redraw(&self, rebuild_paths: bool) {
        self.redraws.borrow_mut().push(rebuild_paths);
    }

    fn plot_rect(&self) -> Rect {
        self.plot_rect.get()
    }

    fn viewport(&self) -> ViewportMetrics {
        self.viewport.get()
    }

    fn surface(&self) -> &PointerSurface {
        &self.surface
    }
}
