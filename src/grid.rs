//! Destination grid: the 3DEM header and the tile geometry derived from it.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::{Rect, TileIndex};
use crate::error::TileplanError;

/// Header cells per tile edge.
pub const SUBTILE_FACTOR: u32 = 64;

/// Tile ids carry two decimal digits per axis.
pub const MAX_TILES_PER_AXIS: u32 = 100;

pub const SUPPORTED_PROJECTION: &str = "UTM Zone 19N";
pub const SUPPORTED_ELLIPSOID: &str = "WGS84";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridConfig {
    pub projection: String,
    pub ellipsoid: String,
    pub left: f64,
    pub lower: f64,
    pub right: f64,
    pub upper: f64,
    pub rows: u32,
    pub columns: u32,
}

impl GridConfig {
    pub fn load(path: &Path) -> Result<Self, TileplanError> {
        let content =
            fs::read_to_string(path).map_err(|_| TileplanError::HeaderRead(path.to_path_buf()))?;
        Self::parse(&content, path)
    }

    /// Lines are `name = value` or `name value`; unknown names are ignored.
    pub fn parse(content: &str, path: &Path) -> Result<Self, TileplanError> {
        let values = header_values(content);
        let field = |name: &'static str| -> Result<&str, TileplanError> {
            values
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| TileplanError::MissingField {
                    path: path.to_path_buf(),
                    field: name,
                })
        };

        // Report every required field up front, in header order.
        for name in [
            "map_projection",
            "ellipsoid",
            "left_map_x",
            "lower_map_y",
            "right_map_x",
            "upper_map_y",
            "number_of_rows",
            "number_of_columns",
        ] {
            field(name)?;
        }

        let projection = field("map_projection")?.to_string();
        if projection != SUPPORTED_PROJECTION {
            return Err(TileplanError::UnsupportedProjection(projection));
        }
        let ellipsoid = field("ellipsoid")?.to_string();
        if ellipsoid != SUPPORTED_ELLIPSOID {
            return Err(TileplanError::UnsupportedEllipsoid(ellipsoid));
        }

        let number = |name: &'static str| -> Result<f64, TileplanError> {
            let raw = field(name)?;
            raw.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| TileplanError::InvalidField {
                    path: path.to_path_buf(),
                    field: name,
                    value: raw.to_string(),
                })
        };
        let count = |name: &'static str| -> Result<u32, TileplanError> {
            let raw = field(name)?;
            raw.parse::<u32>().map_err(|_| TileplanError::InvalidField {
                path: path.to_path_buf(),
                field: name,
                value: raw.to_string(),
            })
        };

        let config = Self {
            projection,
            ellipsoid,
            left: number("left_map_x")?,
            lower: number("lower_map_y")?,
            right: number("right_map_x")?,
            upper: number("upper_map_y")?,
            rows: count("number_of_rows")?,
            columns: count("number_of_columns")?,
        };
        config.validate(path)?;
        Ok(config)
    }

    pub fn validate(&self, path: &Path) -> Result<(), TileplanError> {
        if self.rows == 0
            || self.columns == 0
            || self.rows % SUBTILE_FACTOR != 0
            || self.columns % SUBTILE_FACTOR != 0
        {
            return Err(TileplanError::GridNotAligned {
                path: path.to_path_buf(),
                rows: self.rows,
                cols: self.columns,
            });
        }
        let axes = [("number_of_rows", self.rows), ("number_of_columns", self.columns)];
        for (field, cells) in axes {
            if cells / SUBTILE_FACTOR > MAX_TILES_PER_AXIS {
                return Err(TileplanError::InvalidField {
                    path: path.to_path_buf(),
                    field,
                    value: format!("{cells} (more than {MAX_TILES_PER_AXIS} tiles)"),
                });
            }
        }
        if self.right <= self.left {
            return Err(TileplanError::InvalidField {
                path: path.to_path_buf(),
                field: "right_map_x",
                value: self.right.to_string(),
            });
        }
        if self.upper <= self.lower {
            return Err(TileplanError::InvalidField {
                path: path.to_path_buf(),
                field: "upper_map_y",
                value: self.upper.to_string(),
            });
        }
        Ok(())
    }
}

fn header_line() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"^\s*([^\s=]+)[\s=]*(.*?)\s*$").expect("header line regex is valid")
    })
}

fn header_values(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in content.lines() {
        let Some(caps) = header_line().captures(line) else {
            continue;
        };
        values.insert(caps[1].to_string(), caps[2].to_string());
    }
    values
}

/// Tile layout of a validated grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridGeometry {
    pub left: f64,
    pub lower: f64,
    pub tiles_wide: u32,
    pub tiles_high: u32,
    pub tile_width: f64,
    pub tile_height: f64,
}

impl GridGeometry {
    pub fn new(config: &GridConfig) -> Self {
        let tiles_wide = config.columns / SUBTILE_FACTOR;
        let tiles_high = config.rows / SUBTILE_FACTOR;
        Self {
            left: config.left,
            lower: config.lower,
            tiles_wide,
            tiles_high,
            tile_width: (config.right - config.left) / f64::from(tiles_wide),
            tile_height: (config.upper - config.lower) / f64::from(tiles_high),
        }
    }

    pub fn contains(&self, tile: TileIndex) -> bool {
        tile.hpos < self.tiles_wide && tile.vpos < self.tiles_high
    }

    /// Grid-space rectangle of a tile, `None` outside the grid. Columns are
    /// mirrored: `hpos` 0 is the rightmost column of the grid.
    pub fn tile_extent(&self, tile: TileIndex) -> Option<Rect> {
        if !self.contains(tile) {
            return None;
        }
        let tiles_from_left = self.tiles_wide - tile.hpos - 1;
        let left = self.left + f64::from(tiles_from_left) * self.tile_width;
        let lower = self.lower + f64::from(tile.vpos) * self.tile_height;
        Some(Rect::new(
            left,
            lower + self.tile_height,
            left + self.tile_width,
            lower,
        ))
    }

    /// All tiles in planning order: `hpos` outer, `vpos` inner.
    pub fn tiles(&self) -> impl Iterator<Item = TileIndex> + '_ {
        (0..self.tiles_wide)
            .flat_map(move |hpos| (0..self.tiles_high).map(move |vpos| TileIndex::new(hpos, vpos)))
    }
}
