use chrono::Utc;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::ResolvedSettings;
use crate::domain::TileIndex;
use crate::emit::{CommandSink, WarpJob};
use crate::error::TileplanError;
use crate::fetch::{FetchSet, FetchSetBuilder};
use crate::grid::GridGeometry;
use crate::planner::{PresenceChecker, TileDecision, TilePlanner};
use crate::projection::ProjectionEngine;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: String,
    pub planned: usize,
    pub ready: Vec<String>,
    pub pending: Vec<String>,
    pub failed: Vec<TileFailure>,
    pub skipped: Vec<String>,
    pub fetch: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TileFailure {
    pub tile: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub tile: TileIndex,
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Logs each tile decision through `tracing`.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn event(&self, event: ProgressEvent) {
        tracing::info!(tile = %event.tile, "{}", event.message);
    }
}

/// Which tiles to plan: an explicit list, or the configured default range.
#[derive(Debug, Clone, Default)]
pub struct TileSelection {
    tiles: Vec<TileIndex>,
}

impl TileSelection {
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, TileplanError> {
        let tiles = values
            .iter()
            .map(|value| value.as_ref().parse::<TileIndex>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tiles })
    }

    /// Selected tiles in grid order, each at most once. Named tiles outside
    /// the grid are returned separately; the default range is clipped to the
    /// grid silently.
    pub fn resolve(
        &self,
        geometry: &GridGeometry,
        settings: &ResolvedSettings,
    ) -> (Vec<TileIndex>, Vec<TileIndex>) {
        if self.tiles.is_empty() {
            let wanted = settings.default_tiles.tiles();
            let planned = geometry
                .tiles()
                .filter(|tile| wanted.contains(tile))
                .collect();
            return (planned, Vec::new());
        }

        let planned = geometry
            .tiles()
            .filter(|tile| self.tiles.contains(tile))
            .collect::<Vec<_>>();
        let mut outside = self
            .tiles
            .iter()
            .copied()
            .filter(|tile| !geometry.contains(*tile))
            .collect::<Vec<_>>();
        outside.sort();
        outside.dedup();
        (planned, outside)
    }
}

pub struct App<P: PresenceChecker> {
    settings: ResolvedSettings,
    geometry: GridGeometry,
    engine: ProjectionEngine,
    catalog: Catalog,
    presence: P,
}

impl<P: PresenceChecker> App<P> {
    pub fn new(
        settings: ResolvedSettings,
        geometry: GridGeometry,
        engine: ProjectionEngine,
        catalog: Catalog,
        presence: P,
    ) -> Self {
        Self {
            settings,
            geometry,
            engine,
            catalog,
            presence,
        }
    }

    /// Plans every selected tile. A projection failure is recorded against
    /// its tile and the run carries on; sink errors abort.
    pub fn run(
        &self,
        selection: &TileSelection,
        sink: &mut dyn CommandSink,
        progress: &dyn ProgressSink,
    ) -> Result<RunReport, TileplanError> {
        let planner = TilePlanner::new(&self.geometry, &self.engine, &self.catalog, &self.presence);
        let (tiles, outside) = selection.resolve(&self.geometry, &self.settings);
        for tile in &outside {
            tracing::warn!(
                tile = %tile,
                tiles_wide = self.geometry.tiles_wide,
                tiles_high = self.geometry.tiles_high,
                "selected tile is outside the grid"
            );
        }

        let mut fetch = FetchSetBuilder::new();
        let mut ready = Vec::new();
        let mut pending = Vec::new();
        let mut failed = Vec::new();

        for tile in tiles.iter().copied() {
            let planned = match planner.plan(tile) {
                Ok(planned) => planned,
                Err(err) => {
                    tracing::warn!(tile = %tile, "planning failed: {err}");
                    failed.push(TileFailure {
                        tile: tile.name(),
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            match planned.decision {
                TileDecision::Ready { sources } => {
                    let job = WarpJob {
                        tile,
                        extent: planned.extent,
                        size: self.settings.output_size(tile),
                        sources: sources.iter().map(|record| record.raster.clone()).collect(),
                    };
                    sink.warp(&job)?;
                    progress.event(ProgressEvent {
                        tile,
                        message: format!("ready, {} source rasters", job.sources.len()),
                    });
                    ready.push(tile.name());
                }
                TileDecision::Pending { needed, missing } => {
                    for record in &missing {
                        if fetch.add(record) {
                            tracing::debug!(
                                tile = %tile,
                                sheet = %record.name,
                                queued = fetch.len(),
                                "queued sheet for download"
                            );
                        }
                    }
                    progress.event(ProgressEvent {
                        tile,
                        message: format!(
                            "pending, {} of {} source rasters missing",
                            missing.len(),
                            needed.len()
                        ),
                    });
                    pending.push(tile.name());
                }
            }
        }

        if fetch.is_empty() {
            tracing::debug!("every overlapping sheet is on disk");
        }
        let fetch: FetchSet = fetch.finish();
        sink.fetch(&fetch)?;
        sink.finish()?;

        tracing::info!(
            planned = tiles.len(),
            ready = ready.len(),
            pending = pending.len(),
            failed = failed.len(),
            fetch = fetch.len(),
            "planning finished"
        );

        Ok(RunReport {
            generated_at: Utc::now().to_rfc3339(),
            planned: tiles.len(),
            ready,
            pending,
            failed,
            skipped: outside.iter().map(TileIndex::name).collect(),
            fetch: fetch.names(),
        })
    }
}
