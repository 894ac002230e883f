//! Source imagery catalog: world files and the catalog index.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{Rect, SourceRecord};
use crate::error::TileplanError;

/// Source sheets are always 5000x5000 pixels.
pub const RASTER_PIXELS: f64 = 5000.0;
pub const RASTER_EXTENSION: &str = "tif";
pub const WORLD_FILE_EXTENSION: &str = "tfw";

const PIXEL_SIZE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<SourceRecord>,
    names: HashSet<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record unless one with the same name is already present.
    pub fn insert(&mut self, record: SourceRecord) -> bool {
        if self.names.contains(&record.name) {
            return false;
        }
        self.names.insert(record.name.clone());
        self.records.push(record);
        true
    }

    /// Merges records, keeping existing entries on name collisions.
    /// Returns how many were added.
    pub fn extend(&mut self, records: impl IntoIterator<Item = SourceRecord>) -> usize {
        records
            .into_iter()
            .map(|record| self.insert(record))
            .filter(|added| *added)
            .count()
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Names of sheets known to be corrupt, matched on the base file name.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    names: HashSet<String>,
}

impl IgnoreList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// `17279380.sid.zip` and `17279380.tfw` both match `17279380`.
    pub fn should_ignore(&self, file_name: &str) -> bool {
        let base = file_name.split('.').next().unwrap_or(file_name);
        self.names.contains(base)
    }
}

/// The six affine terms of a world file, in file order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldFile {
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub column_rotation: f64,
    pub pixel_height: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl WorldFile {
    pub fn parse(content: &str, path: &Path) -> Result<Self, TileplanError> {
        let values = content
            .split_whitespace()
            .map_while(|token| token.parse::<f64>().ok())
            .take(6)
            .collect::<Vec<_>>();
        let &[a, d, b, e, c, f] = values.as_slice() else {
            return Err(TileplanError::WorldFileFormat {
                path: path.to_path_buf(),
                message: format!("expected 6 numbers, found {}", values.len()),
            });
        };
        if let Some(bad) = values.iter().find(|value| !value.is_finite()) {
            return Err(TileplanError::WorldFileFormat {
                path: path.to_path_buf(),
                message: format!("non-finite term {bad}"),
            });
        }

        if d != 0.0 || b != 0.0 {
            return Err(TileplanError::WorldFileGeometry {
                path: path.to_path_buf(),
                message: format!("rotation terms must be zero (got {d}, {b})"),
            });
        }
        if (a.abs() - e.abs()).abs() > PIXEL_SIZE_TOLERANCE {
            return Err(TileplanError::WorldFileGeometry {
                path: path.to_path_buf(),
                message: format!("pixels are not square ({a} x {e})"),
            });
        }

        Ok(Self {
            pixel_width: a,
            row_rotation: d,
            column_rotation: b,
            pixel_height: e,
            origin_x: c,
            origin_y: f,
        })
    }

    /// Footprint of a full-size sheet; `pixel_height` is negative for
    /// north-up rasters so `bottom < top`.
    pub fn footprint(&self) -> Rect {
        Rect::new(
            self.origin_x,
            self.origin_y,
            self.origin_x + RASTER_PIXELS * self.pixel_width,
            self.origin_y + RASTER_PIXELS * self.pixel_height,
        )
    }
}

/// Reads every `*.tfw` in `dir`. A malformed world file is skipped with a
/// warning, or aborts the load when `strict` is set.
pub fn load_world_files(
    dir: &Path,
    ignore: &IgnoreList,
    strict: bool,
) -> Result<Vec<SourceRecord>, TileplanError> {
    let entries = fs::read_dir(dir).map_err(|_| TileplanError::CatalogRead(dir.to_path_buf()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| TileplanError::Filesystem(err.to_string()))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == WORLD_FILE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut records = Vec::new();
    for path in paths {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if ignore.should_ignore(file_name) {
            tracing::debug!(file = file_name, "ignoring listed sheet");
            continue;
        }
        match read_world_file(&path) {
            Ok(record) => records.push(record),
            Err(err) if !strict => {
                tracing::warn!("skipping world file: {err}");
            }
            Err(err) => return Err(err),
        }
    }

    tracing::info!(dir = %dir.display(), count = records.len(), "loaded world files");
    Ok(records)
}

fn read_world_file(path: &Path) -> Result<SourceRecord, TileplanError> {
    let content =
        fs::read_to_string(path).map_err(|_| TileplanError::CatalogRead(path.to_path_buf()))?;
    let world = WorldFile::parse(&content, path)?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| TileplanError::WorldFileFormat {
            path: path.to_path_buf(),
            message: "file name is not valid UTF-8".to_string(),
        })?;
    let raster = raster_file_name(name);
    Ok(SourceRecord::new(name, raster, world.footprint()))
}

pub fn load_index(path: &Path, ignore: &IgnoreList) -> Result<Vec<SourceRecord>, TileplanError> {
    let content =
        fs::read_to_string(path).map_err(|_| TileplanError::CatalogRead(path.to_path_buf()))?;
    let records = parse_index(&content, ignore);
    tracing::info!(path = %path.display(), count = records.len(), "loaded catalog index");
    Ok(records)
}

/// Each line is `filename xmin ymin xmax ymax`; anything else is skipped.
pub fn parse_index(content: &str, ignore: &IgnoreList) -> Vec<SourceRecord> {
    let mut records = Vec::new();
    for line in content.lines() {
        let Some((file_name, [xmin, ymin, xmax, ymax])) = parse_index_line(line) else {
            continue;
        };
        if ignore.should_ignore(file_name) {
            tracing::debug!(file = file_name, "ignoring listed sheet");
            continue;
        }
        let name = match file_name.rfind('.') {
            Some(dot) => &file_name[..dot],
            None => file_name,
        };
        records.push(SourceRecord::new(
            name,
            raster_file_name(name),
            Rect::new(xmin, ymax, xmax, ymin),
        ));
    }
    records
}

fn parse_index_line(line: &str) -> Option<(&str, [f64; 4])> {
    let mut fields = line.split_whitespace();
    let file_name = fields.next()?;
    let mut bounds = [0.0; 4];
    for slot in &mut bounds {
        *slot = fields
            .next()?
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())?;
    }
    Some((file_name, bounds))
}

pub fn raster_file_name(name: &str) -> String {
    format!("{name}.{RASTER_EXTENSION}")
}

/// Which catalog sources to read and how strictly.
#[derive(Debug, Clone)]
pub struct CatalogSources {
    pub index_file: Option<PathBuf>,
    pub world_file_dir: Option<PathBuf>,
    pub ignore: IgnoreList,
    pub strict: bool,
}

/// Loads the index first, then world files; index entries win on name
/// collisions.
pub fn load_catalog(sources: &CatalogSources) -> Result<Catalog, TileplanError> {
    let mut catalog = Catalog::new();
    if let Some(index) = &sources.index_file {
        catalog.extend(load_index(index, &sources.ignore)?);
    }
    if let Some(dir) = &sources.world_file_dir {
        let added = catalog.extend(load_world_files(dir, &sources.ignore, sources.strict)?);
        tracing::debug!(added, "merged world file records");
    }
    if catalog.is_empty() {
        tracing::warn!("catalog is empty, every tile will warp from no sources");
    }
    tracing::info!(records = catalog.len(), "catalog ready");
    Ok(catalog)
}
