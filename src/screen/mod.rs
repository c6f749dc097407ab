//! Screen module
//!
//! Display metrics used to scale gesture thresholds to the panel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid display metrics
#[derive(Error, Debug, PartialEq)]
pub enum MetricsError {
    #[error("Density must be positive, got {0}")]
    InvalidDensity(f32),

    #[error("Screen dimensions must be non-zero, got {0}x{1}")]
    InvalidDimensions(u32, u32),
}

/// Physical characteristics of the touch panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    /// Device-independent pixel to physical pixel scale factor
    pub density: f32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        let (width, height) = get_screen_dimensions();
        Self {
            density: 1.0,
            width,
            height,
        }
    }
}

impl DisplayMetrics {
    pub fn new(density: f32, width: u32, height: u32) -> Self {
        Self {
            density,
            width,
            height,
        }
    }

    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.density <= 0.0 || !self.density.is_finite() {
            return Err(MetricsError::InvalidDensity(self.density));
        }
        if self.width == 0 || self.height == 0 {
            return Err(MetricsError::InvalidDimensions(self.width, self.height));
        }
        Ok(())
    }

    /// Length of the shorter screen side
    pub fn short_side(&self) -> u32 {
        self.width.min(self.height)
    }
}

/// Fallback panel size when none is configured
pub fn get_screen_dimensions() -> (u32, u32) {
    // Common portrait phone panel
    (1080, 2340)
}
