// src/features.rs - Detected features and their pixel-space measurements

use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::RockAnalysisError;

/// Orientation class of a fracture line
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// `Horizontal` when the line runs more along x than along y
    pub fn classify(dx: i32, dy: i32) -> Self {
        if dy.abs() < dx.abs() {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which fracture orientations to keep
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrientationFilter {
    #[default]
    All,
    Horizontal,
    Vertical,
}

impl OrientationFilter {
    pub fn accepts(&self, orientation: Orientation) -> bool {
        match self {
            OrientationFilter::All => true,
            OrientationFilter::Horizontal => orientation == Orientation::Horizontal,
            OrientationFilter::Vertical => orientation == Orientation::Vertical,
        }
    }
}

impl FromStr for OrientationFilter {
    type Err = RockAnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(OrientationFilter::All),
            "horizontal" => Ok(OrientationFilter::Horizontal),
            "vertical" => Ok(OrientationFilter::Vertical),
            other => Err(RockAnalysisError::invalid(format!(
                "unrecognized orientation filter '{}' (expected all, horizontal or vertical)",
                other
            ))),
        }
    }
}

/// A straight fracture trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineFeature {
    pub endpoints: [(i32, i32); 2],
    pub length_px: f64,
    pub angle_deg: f64,
    pub orientation: Orientation,
}

/// A closed region (pore or grain) bounded by an external contour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionFeature {
    /// Boundary pixels in tracing order; used for overlays, not exported
    #[serde(skip)]
    pub contour: Vec<Point<i32>>,
    pub area_px: f64,
    pub equivalent_diameter_px: f64,
    /// Only computed in pore mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centroid: Option<(i32, i32)>,
}
