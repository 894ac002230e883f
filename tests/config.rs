use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use tileplan::config::{HIRES_TILE_SIZE, Settings, SettingsLoader, TileRange};
use tileplan::domain::TileIndex;
use tileplan::error::TileplanError;

#[test]
fn settings_file_overrides_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("tileplan.json");
    fs::write(
        &path,
        r#"{
            "header": "grids/Sterling.hdr",
            "source_dir": "imagery",
            "world_files": true,
            "ignore": ["11111111"],
            "hires_tiles": ["t0907"],
            "default_tiles": { "hpos": [7, 8], "vpos": [2, 3] },
            "small_size": 256
        }"#,
    )
    .unwrap();

    let resolved = SettingsLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.header, Utf8PathBuf::from("grids/Sterling.hdr"));
    assert_eq!(resolved.index_file, Utf8PathBuf::from("imagery/imgcat.txt"));
    assert!(resolved.world_files);
    assert!(resolved.use_index);
    assert_eq!(resolved.ignore, vec!["11111111".to_string()]);
    assert_eq!(resolved.sizes.small, 256);
    assert_eq!(resolved.output_size(TileIndex::new(9, 7)), HIRES_TILE_SIZE);
    assert_eq!(
        resolved.default_tiles.tiles(),
        vec![
            TileIndex::new(7, 2),
            TileIndex::new(7, 3),
            TileIndex::new(8, 2),
            TileIndex::new(8, 3),
        ]
    );
}

#[test]
fn missing_settings_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = SettingsLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, TileplanError::SettingsRead(_));
    assert!(err.is_config());
}

#[test]
fn malformed_settings_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("tileplan.json");
    fs::write(&path, "{ \"source_dir\": 7 }").unwrap();
    let err = SettingsLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, TileplanError::SettingsParse(_));
}

#[test]
fn bad_hires_tile_is_rejected() {
    let settings = Settings {
        hires_tiles: vec!["t08x2".to_string()],
        ..Settings::default()
    };
    let err = SettingsLoader::resolve_settings(settings).unwrap_err();
    assert_matches!(err, TileplanError::InvalidTileId(_));
}

#[test]
fn default_range_matches_historic_batch() {
    let tiles = TileRange::default().tiles();
    assert_eq!(tiles.len(), 96);
    assert_eq!(tiles.first(), Some(&TileIndex::new(6, 0)));
    assert_eq!(tiles.last(), Some(&TileIndex::new(11, 15)));
}
