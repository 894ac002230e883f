use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TileplanError {
    #[error("failed to read settings file at {0}")]
    SettingsRead(PathBuf),

    #[error("failed to parse JSON settings: {0}")]
    SettingsParse(String),

    #[error("can't open header {0}")]
    HeaderRead(PathBuf),

    #[error("{path}: missing value for {field}")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("{path}: invalid value for {field}: {value}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        value: String,
    },

    #[error("unsupported map projection: {0} (expected \"UTM Zone 19N\")")]
    UnsupportedProjection(String),

    #[error("unsupported ellipsoid: {0} (expected \"WGS84\")")]
    UnsupportedEllipsoid(String),

    #[error("{path}: rows and cols must be multiples of 64 (got {rows} rows, {cols} cols)")]
    #[diagnostic(help("the texture grid is cut into tiles of 64 header cells"))]
    GridNotAligned { path: PathBuf, rows: u32, cols: u32 },

    #[error("invalid tile id: {0}")]
    #[diagnostic(help("tile ids are hhvv, e.g. 1208 for column 12, row 08"))]
    InvalidTileId(String),

    #[error("tile {tile} is outside the {tiles_wide}x{tiles_high} grid")]
    TileOutsideGrid {
        tile: String,
        tiles_wide: u32,
        tiles_high: u32,
    },

    #[error("can't open catalog source {0}")]
    CatalogRead(PathBuf),

    #[error("{path}: bad format: {message}")]
    WorldFileFormat { path: PathBuf, message: String },

    #[error("{path}: bad world file: {message}")]
    #[diagnostic(help("only north-up rasters with square pixels are supported"))]
    WorldFileGeometry { path: PathBuf, message: String },

    #[error("projection failed: {0}")]
    Projection(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl TileplanError {
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            TileplanError::SettingsRead(_)
                | TileplanError::SettingsParse(_)
                | TileplanError::HeaderRead(_)
                | TileplanError::MissingField { .. }
                | TileplanError::InvalidField { .. }
                | TileplanError::UnsupportedProjection(_)
                | TileplanError::UnsupportedEllipsoid(_)
                | TileplanError::GridNotAligned { .. }
                | TileplanError::InvalidTileId(_)
        )
    }

    pub fn is_catalog(&self) -> bool {
        matches!(
            self,
            TileplanError::CatalogRead(_)
                | TileplanError::WorldFileFormat { .. }
                | TileplanError::WorldFileGeometry { .. }
        )
    }
}
