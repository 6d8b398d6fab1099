pub mod calendar;
pub mod chart;
pub mod headless;
pub mod scale;
pub mod series;
pub mod types;

pub use calendar::new_calendar_day_indices;
pub use chart::{ChartHandle, ChartRef};
pub use headless::{AlignedData, DEFAULT_Y_SCALE, HeadlessChart, HeadlessChartBuilder};
pub use scale::{LinearScale, ScaleOrientation};
pub use series::{
    DEFAULT_COLOR_FALLBACK, DEFAULT_FILL, DEFAULT_STROKE, LabelTransform, Paint, SeriesConfig,
    SeriesDataOptions, SeriesDatum, color_string, fallback_label, series_data,
};
pub use types::{ChartId, Position, Rect, Size, ViewportMetrics};
