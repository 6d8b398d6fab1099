use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

/// Pixel axis a scale maps onto.
///
/// Vertical scales grow upward: the domain start lands on the bottom edge of
/// the plotting area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleOrientation {
    Horizontal,
    #[default]
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
    orientation: ScaleOrientation,
}

impl LinearScale {
    pub fn new(domain_start: f64, domain_end: f64) -> PluginResult<Self> {
        if !domain_start.is_finite() || !domain_end.is_finite() || domain_start == domain_end {
            return Err(PluginError::InvalidData(
                "scale domain must be finite and non-zero".to_owned(),
            ));
        }

        Ok(Self {
            domain_start,
            domain_end,
            orientation: ScaleOrientation::default(),
        })
    }

    #[must_use]
    pub fn with_orientation(mut self, orientation: ScaleOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    #[must_use]
    pub fn orientation(self) -> ScaleOrientation {
        self.orientation
    }

    /// Maps `value` to a pixel offset along an axis `extent` pixels long.
    pub fn domain_to_pixel(self, value: f64, extent: f64) -> PluginResult<f64> {
        if !extent.is_finite() || extent <= 0.0 {
            return Err(PluginError::InvalidData(
                "pixel extent must be finite and > 0".to_owned(),
            ));
        }

        if !value.is_finite() {
            return Err(PluginError::InvalidData("value must be finite".to_owned()));
        }

        let span = self.domain_end - self.domain_start;
        let normalized = (value - self.domain_start) / span;
        Ok(match self.orientation {
            ScaleOrientation::Horizontal => normalized * extent,
            ScaleOrientation::Vertical => (1.0 - normalized) * extent,
        })
    }

    pub fn pixel_to_domain(self, pixel: f64, extent: f64) -> PluginResult<f64> {
        if !extent.is_finite() || extent <= 0.0 {
            return Err(PluginError::InvalidData(
                "pixel extent must be finite and > 0".to_owned(),
            ));
        }

        if !pixel.is_finite() {
            return Err(PluginError::InvalidData("pixel must be finite".to_owned()));
        }

        let span = self.domain_end - self.domain_start;
        let normalized = match self.orientation {
            ScaleOrientation::Horizontal => pixel / extent,
            ScaleOrientation::Vertical => 1.0 - pixel / extent,
        };
        Ok(self.domain_start + normalized * span)
    }
}
