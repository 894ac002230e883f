use std::collections::HashSet;
use std::fs;
use std::sync::Mutex;

use camino::Utf8PathBuf;

use tileplan::app::{App, ProgressEvent, ProgressSink, TileSelection};
use tileplan::catalog::Catalog;
use tileplan::config::{NORMAL_TILE_SIZE, Settings, SettingsLoader};
use tileplan::domain::{Rect, SourceRecord, TileIndex};
use tileplan::emit::{CommandSink, ScriptLayout, ScriptSink, WarpJob};
use tileplan::error::TileplanError;
use tileplan::fetch::FetchSet;
use tileplan::grid::GridGeometry;
use tileplan::output::JsonOutput;
use tileplan::planner::PresenceChecker;
use tileplan::projection::{Projection, ProjectionEngine};

struct Identity;

impl Projection for Identity {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TileplanError> {
        Ok((lon, lat))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TileplanError> {
        Ok((x, y))
    }
}

/// Fails north of 905 km, like a point outside the projection's domain.
struct NorthernEdge;

impl Projection for NorthernEdge {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TileplanError> {
        Ok((lon, lat))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TileplanError> {
        if y > 905_000.0 {
            return Err(TileplanError::Projection(format!("y = {y} out of range")));
        }
        Ok((x, y))
    }
}

struct OnDisk(HashSet<&'static str>);

impl PresenceChecker for OnDisk {
    fn is_present(&self, raster: &str) -> bool {
        self.0.contains(raster)
    }
}

#[derive(Default)]
struct RecordingSink {
    jobs: Vec<WarpJob>,
    fetched: Vec<String>,
    finished: usize,
}

impl CommandSink for RecordingSink {
    fn warp(&mut self, job: &WarpJob) -> Result<(), TileplanError> {
        self.jobs.push(job.clone());
        Ok(())
    }

    fn fetch(&mut self, set: &FetchSet) -> Result<(), TileplanError> {
        self.fetched.extend(set.names());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TileplanError> {
        self.finished += 1;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingProgress {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event.tile.name());
    }
}

fn geometry() -> GridGeometry {
    GridGeometry {
        left: 300_000.0,
        lower: 900_000.0,
        tiles_wide: 10,
        tiles_high: 10,
        tile_width: 1000.0,
        tile_height: 1000.0,
    }
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    // Inside t0000 only.
    catalog.insert(SourceRecord::new(
        "a",
        "a.tif",
        Rect::new(309_200.0, 900_800.0, 309_800.0, 900_200.0),
    ));
    // Spans t0100 and t0101.
    catalog.insert(SourceRecord::new(
        "b",
        "b.tif",
        Rect::new(308_200.0, 901_800.0, 308_800.0, 900_200.0),
    ));
    catalog
}

fn app(grid_projection: Box<dyn Projection>) -> App<OnDisk> {
    let settings = SettingsLoader::resolve_settings(Settings::default()).unwrap();
    App::new(
        settings,
        geometry(),
        ProjectionEngine::new(grid_projection, Box::new(Identity)),
        catalog(),
        OnDisk(HashSet::from(["a.tif"])),
    )
}

#[test]
fn run_splits_ready_and_pending_tiles() {
    let app = app(Box::new(Identity));
    let selection = TileSelection::parse(&["0000", "0100", "0101"]).unwrap();
    let mut sink = RecordingSink::default();
    let progress = RecordingProgress::default();

    let report = app.run(&selection, &mut sink, &progress).unwrap();

    assert_eq!(report.planned, 3);
    assert_eq!(report.ready, vec!["t0000".to_string()]);
    assert_eq!(report.pending, vec!["t0100".to_string(), "t0101".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(report.fetch, vec!["b".to_string()]);

    assert_eq!(sink.jobs.len(), 1);
    let job = &sink.jobs[0];
    assert_eq!(job.tile, TileIndex::new(0, 0));
    assert_eq!(job.size, NORMAL_TILE_SIZE);
    assert_eq!(job.sources, vec!["a.tif".to_string()]);
    assert_eq!(job.extent, Rect::new(309_000.0, 901_000.0, 310_000.0, 900_000.0));
    assert_eq!(sink.fetched, vec!["b".to_string()]);
    assert_eq!(sink.finished, 1);

    let events = progress.events.lock().unwrap();
    assert_eq!(events.as_slice(), ["t0000", "t0100", "t0101"]);
}

#[test]
fn empty_tile_counts_as_ready() {
    let app = app(Box::new(Identity));
    let selection = TileSelection::parse(&["0505"]).unwrap();
    let mut sink = RecordingSink::default();

    let report = app.run(&selection, &mut sink, &JsonOutput).unwrap();

    assert_eq!(report.ready, vec!["t0505".to_string()]);
    assert!(sink.jobs[0].sources.is_empty());
    assert!(report.fetch.is_empty());
}

#[test]
fn projection_failure_is_isolated_to_its_tile() {
    let app = app(Box::new(NorthernEdge));
    let selection = TileSelection::parse(&["0005", "0000", "0100", "2000"]).unwrap();
    let mut sink = RecordingSink::default();

    let report = app.run(&selection, &mut sink, &JsonOutput).unwrap();

    assert_eq!(report.planned, 3);
    assert_eq!(report.ready, vec!["t0000".to_string()]);
    assert_eq!(report.pending, vec!["t0100".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].tile, "t0005");
    assert!(report.failed[0].message.contains("out of range"));
    assert_eq!(report.skipped, vec!["t2000".to_string()]);
    assert_eq!(sink.finished, 1);
}

#[test]
fn default_selection_is_clipped_to_the_grid() {
    let settings = SettingsLoader::resolve_settings(Settings::default()).unwrap();
    let (planned, outside) = TileSelection::default().resolve(&geometry(), &settings);

    assert_eq!(planned.len(), 4 * 10);
    assert_eq!(planned.first(), Some(&TileIndex::new(6, 0)));
    assert_eq!(planned.last(), Some(&TileIndex::new(9, 9)));
    assert!(outside.is_empty());
}

#[test]
fn default_run_reports_no_skipped_tiles() {
    let app = app(Box::new(Identity));
    let mut sink = RecordingSink::default();

    let report = app
        .run(&TileSelection::default(), &mut sink, &JsonOutput)
        .unwrap();

    assert_eq!(report.planned, 4 * 10);
    assert!(report.skipped.is_empty());
    assert!(report.failed.is_empty());
}

#[test]
fn explicit_selection_follows_grid_order_once() {
    let settings = SettingsLoader::resolve_settings(Settings::default()).unwrap();
    let selection = TileSelection::parse(&["0102", "0001", "0102", "t0100"]).unwrap();
    let (planned, outside) = selection.resolve(&geometry(), &settings);

    assert_eq!(
        planned,
        vec![
            TileIndex::new(0, 1),
            TileIndex::new(1, 0),
            TileIndex::new(1, 2),
        ]
    );
    assert!(outside.is_empty());
}

#[test]
fn script_sink_writes_both_scripts() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let settings = SettingsLoader::resolve_settings(Settings {
        run_script: Some(root.join("TMP.run")),
        fetch_script: Some(root.join("TMP.get")),
        textures_dir: Some(root.join("Textures")),
        ..Settings::default()
    })
    .unwrap();
    let layout = ScriptLayout::from_settings(&settings, &root);
    assert_eq!(layout.tiffs_dir, root.join("tiffs"));

    let app = app(Box::new(Identity));
    let selection = TileSelection::parse(&["0000", "0100"]).unwrap();
    let mut sink = ScriptSink::new(layout, false);
    app.run(&selection, &mut sink, &JsonOutput).unwrap();

    let run = fs::read_to_string(root.join("TMP.run")).unwrap();
    let tiff = root.join("tiffs/t0000.tif");
    let expected = format!(
        "(cd massgis &&  gdalwarp -s_srs 'EPSG:26986' -t_srs '{}' -ts 2048 2048 \
         -te 309000 900000 310000 901000 a.tif {tiff})\n\
         tifftopnm {tiff} | pnmflip -rotate180 > TMP.ppm\n\
         ppmtobmp TMP.ppm > {root}/Textures/t0000.bmp\n\
         pnmscale -xsize=512 TMP.ppm | ppmtobmp > {root}/Textures/Small/t0000.bmp\n\n",
        settings.target_srs
    );
    assert_eq!(run, expected);

    let get = fs::read_to_string(root.join("TMP.get")).unwrap();
    assert_eq!(
        get,
        format!(
            "cd massgis\nwget '{}/b.zip'\n./do-mrsid b.zip\n",
            settings.fetch_url
        )
    );

    assert!(root.join("tiffs").as_std_path().is_dir());
    assert!(root.join("Textures/Small").as_std_path().is_dir());
}

#[test]
fn dry_run_touches_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let settings = SettingsLoader::resolve_settings(Settings {
        run_script: Some(root.join("TMP.run")),
        fetch_script: Some(root.join("TMP.get")),
        textures_dir: Some(root.join("Textures")),
        ..Settings::default()
    })
    .unwrap();
    let mut sink = ScriptSink::new(ScriptLayout::from_settings(&settings, &root), true);

    let app = app(Box::new(Identity));
    let selection = TileSelection::parse(&["0000", "0100"]).unwrap();
    app.run(&selection, &mut sink, &JsonOutput).unwrap();

    assert!(sink.run_script().contains("gdalwarp"));
    assert!(sink.fetch_script().contains("./do-mrsid b.zip"));
    assert!(!root.join("TMP.run").as_std_path().exists());
    assert!(!root.join("tiffs").as_std_path().exists());
}
