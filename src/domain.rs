use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TileplanError;

/// A position in some projected system, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle with `bottom <= top` and `left <= right`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_corners(lower_left: Point, upper_right: Point) -> Self {
        Self {
            left: lower_left.x,
            top: upper_right.y,
            right: upper_right.x,
            bottom: lower_left.y,
        }
    }

    pub fn lower_left(&self) -> Point {
        Point::new(self.left, self.bottom)
    }

    pub fn upper_right(&self) -> Point {
        Point::new(self.right, self.top)
    }

    /// Closed-interval overlap: rectangles sharing only an edge still overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(other.right < self.left
            || other.left > self.right
            || other.top < self.bottom
            || other.bottom > self.top)
    }
}

/// Destination tile position. `hpos` counts from the grid's right edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub hpos: u32,
    pub vpos: u32,
}

impl TileIndex {
    pub fn new(hpos: u32, vpos: u32) -> Self {
        Self { hpos, vpos }
    }

    /// Numeric form used on the command line, `hpos * 100 + vpos`.
    pub fn number(&self) -> u32 {
        self.hpos * 100 + self.vpos
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{:04}", self.number())
    }
}

impl FromStr for TileIndex {
    type Err = TileplanError;

    /// Accepts `1208`, `t1208` or `0005`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix('t').unwrap_or(trimmed);
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(TileplanError::InvalidTileId(value.to_string()));
        }
        let number: u32 = digits
            .parse()
            .map_err(|_| TileplanError::InvalidTileId(value.to_string()))?;
        Ok(Self::new(number / 100, number % 100))
    }
}

/// One georeferenced source raster in the imagery catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRecord {
    pub name: String,
    pub raster: String,
    pub footprint: Rect,
}

impl SourceRecord {
    pub fn new(name: impl Into<String>, raster: impl Into<String>, footprint: Rect) -> Self {
        Self {
            name: name.into(),
            raster: raster.into(),
            footprint,
        }
    }
}
