use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::ChartHandle;

pub const DEFAULT_STROKE: &str = "#000";
pub const DEFAULT_FILL: &str = "transparent";
pub const DEFAULT_COLOR_FALLBACK: &str = "#888";

/// Resolved stroke/fill value of a series.
///
/// Gradients and patterns are opaque engine objects; only solid colors carry
/// a CSS color string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Paint {
    Solid(String),
    Gradient,
    Pattern,
}

impl Paint {
    #[must_use]
    pub fn solid(color: impl Into<String>) -> Self {
        Self::Solid(color.into())
    }

    #[must_use]
    pub fn as_color(&self) -> Option<&str> {
        match self {
            Self::Solid(color) => Some(color),
            Self::Gradient | Self::Pattern => None,
        }
    }
}

/// Returns the CSS color of `paint`, or `fallback` for anything that is not a
/// solid color.
#[must_use]
pub fn color_string(paint: Option<&Paint>, fallback: &str) -> String {
    paint
        .and_then(Paint::as_color)
        .unwrap_or(fallback)
        .to_owned()
}

/// Engine-side configuration of one series, as exposed by a chart handle.
///
/// Index 0 of a chart's series list is the x series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub label: Option<String>,
    pub stroke: Option<Paint>,
    pub fill: Option<Paint>,
    pub width: Option<f64>,
    pub dash: Option<Vec<f64>>,
    pub scale: Option<String>,
    pub show: bool,
    pub alpha: f64,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            label: None,
            stroke: None,
            fill: None,
            width: None,
            dash: None,
            scale: None,
            show: true,
            alpha: 1.0,
        }
    }
}

impl SeriesConfig {
    #[must_use]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_stroke(mut self, stroke: Paint) -> Self {
        self.stroke = Some(stroke);
        self
    }

    #[must_use]
    pub fn with_fill(mut self, fill: Paint) -> Self {
        self.fill = Some(fill);
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn with_dash(mut self, dash: Vec<f64>) -> Self {
        self.dash = Some(dash);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: impl Into<String>) -> Self {
        self.scale = Some(scale.into());
        self
    }

    #[must_use]
    pub fn with_show(mut self, show: bool) -> Self {
        self.show = show;
        self
    }
}

/// Read-only metadata snapshot of one y series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDatum {
    /// Zero-based position among the y series.
    pub idx: usize,
    /// Engine index (the x series occupies 0).
    pub series_idx: usize,
    pub label: String,
    pub stroke: Paint,
    pub fill: Paint,
    pub width: Option<f64>,
    pub dash: Option<Vec<f64>>,
    pub scale: Option<String>,
    pub visible: bool,
}

pub type LabelTransform = Rc<dyn Fn(Option<&str>) -> String>;

#[derive(Clone, Default)]
pub struct SeriesDataOptions {
    pub label_transform: Option<LabelTransform>,
}

impl SeriesDataOptions {
    #[must_use]
    pub fn with_label_transform(mut self, transform: impl Fn(Option<&str>) -> String + 'static) -> Self {
        self.label_transform = Some(Rc::new(transform));
        self
    }
}

impl fmt::Debug for SeriesDataOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesDataOptions")
            .field("label_transform", &self.label_transform.is_some())
            .finish()
    }
}

/// Positional fallback name for an unlabeled series.
#[must_use]
pub fn fallback_label(series_idx: usize) -> String {
    format!("Series {series_idx}")
}

/// Extracts metadata for every y series of `chart`, in engine order.
#[must_use]
pub fn series_data(chart: &dyn ChartHandle, options: &SeriesDataOptions) -> Vec<SeriesDatum> {
    chart
        .series()
        .into_iter()
        .enumerate()
        .skip(1)
        .map(|(series_idx, series)| {
            let transformed = options
                .label_transform
                .as_ref()
                .map(|transform| transform(series.label.as_deref()))
                .filter(|label| !label.is_empty());
            let label = transformed
                .or_else(|| series.label.clone().filter(|label| !label.is_empty()))
                .unwrap_or_else(|| fallback_label(series_idx));

            SeriesDatum {
                idx: series_idx - 1,
                series_idx,
                label,
                stroke: series.stroke.unwrap_or_else(|| Paint::solid(DEFAULT_STROKE)),
                fill: series.fill.unwrap_or_else(|| Paint::solid(DEFAULT_FILL)),
                width: series.width,
                dash: series.dash,
                scale: series.scale,
                visible: series.show,
            }
        })
        .collect()
}
