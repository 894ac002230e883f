//! Per-tile overlap resolution.

use std::fs::File;
use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::domain::{Rect, SourceRecord, TileIndex};
use crate::error::TileplanError;
use crate::grid::GridGeometry;
use crate::projection::ProjectionEngine;

/// Tells whether a source raster is available locally.
pub trait PresenceChecker: Send + Sync {
    fn is_present(&self, raster: &str) -> bool;
}

/// Looks for rasters in the source directory. Anything that can't be
/// opened for reading counts as absent.
#[derive(Debug, Clone)]
pub struct DirPresence {
    dir: PathBuf,
}

impl DirPresence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PresenceChecker for DirPresence {
    fn is_present(&self, raster: &str) -> bool {
        File::open(self.dir.join(raster)).is_ok()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TileDecision<'a> {
    /// Every overlapping sheet is on disk; `sources` may be empty.
    Ready { sources: Vec<&'a SourceRecord> },
    /// At least one overlapping sheet is missing.
    Pending {
        needed: Vec<&'a SourceRecord>,
        missing: Vec<&'a SourceRecord>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedTile<'a> {
    pub tile: TileIndex,
    /// Tile rectangle in grid coordinates.
    pub extent: Rect,
    /// Approximate tile rectangle in catalog coordinates.
    pub footprint: Rect,
    pub decision: TileDecision<'a>,
}

pub struct TilePlanner<'a, P: PresenceChecker> {
    geometry: &'a GridGeometry,
    engine: &'a ProjectionEngine,
    catalog: &'a Catalog,
    presence: &'a P,
}

impl<'a, P: PresenceChecker> TilePlanner<'a, P> {
    pub fn new(
        geometry: &'a GridGeometry,
        engine: &'a ProjectionEngine,
        catalog: &'a Catalog,
        presence: &'a P,
    ) -> Self {
        Self {
            geometry,
            engine,
            catalog,
            presence,
        }
    }

    /// Only the lower-left and upper-right corners are reprojected; the
    /// footprint is the rectangle they span in catalog space.
    pub fn footprint(&self, extent: &Rect) -> Result<Rect, TileplanError> {
        let lower_left = self.engine.to_catalog(extent.lower_left())?;
        let upper_right = self.engine.to_catalog(extent.upper_right())?;
        Ok(Rect::from_corners(lower_left, upper_right))
    }

    pub fn plan(&self, tile: TileIndex) -> Result<PlannedTile<'a>, TileplanError> {
        let extent = self.geometry.tile_extent(tile).ok_or_else(|| {
            TileplanError::TileOutsideGrid {
                tile: tile.name(),
                tiles_wide: self.geometry.tiles_wide,
                tiles_high: self.geometry.tiles_high,
            }
        })?;
        let footprint = self.footprint(&extent)?;

        let mut needed = Vec::new();
        let mut missing = Vec::new();
        for record in self.catalog.records() {
            if !footprint.overlaps(&record.footprint) {
                continue;
            }
            needed.push(record);
            if !self.presence.is_present(&record.raster) {
                missing.push(record);
            }
        }

        tracing::debug!(
            tile = %tile,
            overlapping = needed.len(),
            missing = missing.len(),
            "planned tile"
        );

        let decision = if missing.is_empty() {
            TileDecision::Ready { sources: needed }
        } else {
            TileDecision::Pending { needed, missing }
        };
        Ok(PlannedTile {
            tile,
            extent,
            footprint,
            decision,
        })
    }
}
