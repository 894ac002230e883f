use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::TileIndex;
use crate::error::TileplanError;

pub const SETTINGS_FILE: &str = "tileplan.json";

pub const NORMAL_TILE_SIZE: u32 = 2048;
pub const HIRES_TILE_SIZE: u32 = 4096;
pub const SMALL_TILE_SIZE: u32 = 512;

pub const DEFAULT_FETCH_URL: &str = "http://wsgw.mass.gov/data/gispub/images/coq2008_30cm_sid";
pub const DEFAULT_SOURCE_SRS: &str = "EPSG:26986";
pub const DEFAULT_TARGET_SRS: &str = "+proj=utm +zone=19 +ellps=WGS84 +datum=WGS84 +units=m +no_defs";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub header: Option<Utf8PathBuf>,
    #[serde(default)]
    pub source_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub index_file: Option<Utf8PathBuf>,
    #[serde(default)]
    pub use_index: Option<bool>,
    #[serde(default)]
    pub world_files: Option<bool>,
    #[serde(default)]
    pub strict_catalog: Option<bool>,
    #[serde(default)]
    pub ignore: Option<Vec<String>>,
    #[serde(default)]
    pub hires_tiles: Vec<String>,
    #[serde(default)]
    pub default_tiles: Option<TileRange>,
    #[serde(default)]
    pub run_script: Option<Utf8PathBuf>,
    #[serde(default)]
    pub fetch_script: Option<Utf8PathBuf>,
    #[serde(default)]
    pub tiffs_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub textures_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub normal_size: Option<u32>,
    #[serde(default)]
    pub hires_size: Option<u32>,
    #[serde(default)]
    pub small_size: Option<u32>,
    #[serde(default)]
    pub fetch_url: Option<String>,
    #[serde(default)]
    pub source_srs: Option<String>,
    #[serde(default)]
    pub target_srs: Option<String>,
}

/// Inclusive tile range planned when no tiles are named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TileRange {
    pub hpos: [u32; 2],
    pub vpos: [u32; 2],
}

impl Default for TileRange {
    fn default() -> Self {
        Self {
            hpos: [6, 11],
            vpos: [0, 15],
        }
    }
}

impl TileRange {
    pub fn tiles(&self) -> Vec<TileIndex> {
        let mut tiles = Vec::new();
        for hpos in self.hpos[0]..=self.hpos[1] {
            for vpos in self.vpos[0]..=self.vpos[1] {
                tiles.push(TileIndex::new(hpos, vpos));
            }
        }
        tiles
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSizes {
    pub normal: u32,
    pub hires: u32,
    pub small: u32,
}

#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub header: Utf8PathBuf,
    pub source_dir: Utf8PathBuf,
    pub index_file: Utf8PathBuf,
    pub use_index: bool,
    pub world_files: bool,
    pub strict_catalog: bool,
    pub ignore: Vec<String>,
    pub hires_tiles: Vec<TileIndex>,
    pub default_tiles: TileRange,
    pub run_script: Utf8PathBuf,
    pub fetch_script: Utf8PathBuf,
    pub tiffs_dir: Utf8PathBuf,
    pub textures_dir: Utf8PathBuf,
    pub sizes: TileSizes,
    pub fetch_url: String,
    pub source_srs: String,
    pub target_srs: String,
}

impl ResolvedSettings {
    pub fn is_hires(&self, tile: TileIndex) -> bool {
        self.hires_tiles.contains(&tile)
    }

    pub fn output_size(&self, tile: TileIndex) -> u32 {
        if self.is_hires(tile) {
            self.sizes.hires
        } else {
            self.sizes.normal
        }
    }
}

pub struct SettingsLoader;

impl SettingsLoader {
    /// An explicit path must exist. Without one, `./tileplan.json` and then
    /// the user config directory are tried before falling back to defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedSettings, TileplanError> {
        let settings_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };

        let Some(settings_path) = settings_path else {
            tracing::debug!("no {SETTINGS_FILE} found, using built-in settings");
            return Self::resolve_settings(Settings::default());
        };

        let content = fs::read_to_string(&settings_path)
            .map_err(|_| TileplanError::SettingsRead(settings_path.clone()))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|err| TileplanError::SettingsParse(err.to_string()))?;
        tracing::debug!(path = %settings_path.display(), "loaded settings");

        Self::resolve_settings(settings)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(SETTINGS_FILE);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("tileplan").join(SETTINGS_FILE))
            .filter(|path| path.exists())
    }

    pub fn resolve_settings(settings: Settings) -> Result<ResolvedSettings, TileplanError> {
        let source_dir = settings
            .source_dir
            .unwrap_or_else(|| Utf8PathBuf::from("massgis"));
        let index_file = settings
            .index_file
            .unwrap_or_else(|| source_dir.join("imgcat.txt"));

        let hires_tiles = settings
            .hires_tiles
            .iter()
            .map(|value| value.parse::<TileIndex>())
            .collect::<Result<Vec<_>, TileplanError>>()?;

        let default_tiles = settings.default_tiles.unwrap_or_default();
        if default_tiles.hpos[0] > default_tiles.hpos[1]
            || default_tiles.vpos[0] > default_tiles.vpos[1]
        {
            return Err(TileplanError::SettingsParse(format!(
                "default_tiles range is empty: {default_tiles:?}"
            )));
        }

        Ok(ResolvedSettings {
            header: settings
                .header
                .unwrap_or_else(|| Utf8PathBuf::from("Sterling.hdr")),
            source_dir,
            index_file,
            use_index: settings.use_index.unwrap_or(true),
            world_files: settings.world_files.unwrap_or(false),
            strict_catalog: settings.strict_catalog.unwrap_or(false),
            ignore: settings.ignore.unwrap_or_else(default_ignore_list),
            hires_tiles,
            default_tiles,
            run_script: settings
                .run_script
                .unwrap_or_else(|| Utf8PathBuf::from("TMP.run")),
            fetch_script: settings
                .fetch_script
                .unwrap_or_else(|| Utf8PathBuf::from("TMP.get")),
            tiffs_dir: settings
                .tiffs_dir
                .unwrap_or_else(|| Utf8PathBuf::from("tiffs")),
            textures_dir: settings
                .textures_dir
                .unwrap_or_else(|| Utf8PathBuf::from("Textures")),
            sizes: TileSizes {
                normal: settings.normal_size.unwrap_or(NORMAL_TILE_SIZE),
                hires: settings.hires_size.unwrap_or(HIRES_TILE_SIZE),
                small: settings.small_size.unwrap_or(SMALL_TILE_SIZE),
            },
            fetch_url: settings
                .fetch_url
                .unwrap_or_else(|| DEFAULT_FETCH_URL.to_string()),
            source_srs: settings
                .source_srs
                .unwrap_or_else(|| DEFAULT_SOURCE_SRS.to_string()),
            target_srs: settings
                .target_srs
                .unwrap_or_else(|| DEFAULT_TARGET_SRS.to_string()),
        })
    }
}

/// Sheets the imagery server is known to serve corrupt.
pub fn default_ignore_list() -> Vec<String> {
    vec![
        "17279380".to_string(),
        "17429380".to_string(),
        "16228735".to_string(),
        "19679080".to_string(),
        "19378930".to_string(),
    ]
}
