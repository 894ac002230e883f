//! Run and fetch script rendering.

use std::fmt::Write as _;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::ResolvedSettings;
use crate::domain::{Rect, TileIndex};
use crate::error::TileplanError;
use crate::fetch::FetchSet;
use crate::fs_util::{pave_path, write_atomic};

/// One ready tile: warp `sources` into `extent` at `size` x `size` pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpJob {
    pub tile: TileIndex,
    pub extent: Rect,
    pub size: u32,
    pub sources: Vec<String>,
}

/// Receives the planner's decisions.
pub trait CommandSink {
    fn warp(&mut self, job: &WarpJob) -> Result<(), TileplanError>;
    fn fetch(&mut self, set: &FetchSet) -> Result<(), TileplanError>;
    fn finish(&mut self) -> Result<(), TileplanError>;
}

#[derive(Debug, Clone)]
pub struct ScriptLayout {
    pub source_dir: Utf8PathBuf,
    /// Must be absolute: the warp command runs from `source_dir`.
    pub tiffs_dir: Utf8PathBuf,
    pub textures_dir: Utf8PathBuf,
    pub run_script: Utf8PathBuf,
    pub fetch_script: Utf8PathBuf,
    pub source_srs: String,
    pub target_srs: String,
    pub small_size: u32,
    pub fetch_url: String,
}

impl ScriptLayout {
    /// Relative tiff directories are anchored at `cwd`.
    pub fn from_settings(settings: &ResolvedSettings, cwd: &Utf8Path) -> Self {
        let tiffs_dir = if settings.tiffs_dir.is_absolute() {
            settings.tiffs_dir.clone()
        } else {
            cwd.join(&settings.tiffs_dir)
        };
        Self {
            source_dir: settings.source_dir.clone(),
            tiffs_dir,
            textures_dir: settings.textures_dir.clone(),
            run_script: settings.run_script.clone(),
            fetch_script: settings.fetch_script.clone(),
            source_srs: settings.source_srs.clone(),
            target_srs: settings.target_srs.clone(),
            small_size: settings.sizes.small,
            fetch_url: settings.fetch_url.clone(),
        }
    }
}

/// Builds both scripts in memory and writes them on `finish`. In dry-run
/// mode nothing touches the filesystem.
pub struct ScriptSink {
    layout: ScriptLayout,
    dry_run: bool,
    run: String,
    fetch: String,
}

impl ScriptSink {
    pub fn new(layout: ScriptLayout, dry_run: bool) -> Self {
        let fetch = format!("cd {}\n", layout.source_dir);
        Self {
            layout,
            dry_run,
            run: String::new(),
            fetch,
        }
    }

    pub fn run_script(&self) -> &str {
        &self.run
    }

    pub fn fetch_script(&self) -> &str {
        &self.fetch
    }

    fn prepare(&self, path: &Utf8Path) -> Result<(), TileplanError> {
        if self.dry_run {
            return Ok(());
        }
        pave_path(path)
    }
}

impl CommandSink for ScriptSink {
    fn warp(&mut self, job: &WarpJob) -> Result<(), TileplanError> {
        let layout = &self.layout;
        let name = job.tile.name();
        let tiff = layout.tiffs_dir.join(format!("{name}.tif"));
        let texture = layout.textures_dir.join(format!("{name}.bmp"));
        let small = layout.textures_dir.join("Small").join(format!("{name}.bmp"));
        self.prepare(&tiff)?;
        self.prepare(&texture)?;
        self.prepare(&small)?;

        let mut cmd = format!("(cd {} && ", layout.source_dir);
        cmd.push_str(" gdalwarp");
        let _ = write!(cmd, " -s_srs '{}'", layout.source_srs);
        let _ = write!(cmd, " -t_srs '{}'", layout.target_srs);
        let _ = write!(cmd, " -ts {} {}", job.size, job.size);
        let _ = write!(
            cmd,
            " -te {} {} {} {}",
            format_g(job.extent.left),
            format_g(job.extent.bottom),
            format_g(job.extent.right),
            format_g(job.extent.top)
        );
        for source in &job.sources {
            let _ = write!(cmd, " {source}");
        }
        let _ = write!(cmd, " {tiff})");

        let run = &mut self.run;
        let _ = writeln!(run, "{cmd}");
        let _ = writeln!(run, "tifftopnm {tiff} | pnmflip -rotate180 > TMP.ppm");
        let _ = writeln!(run, "ppmtobmp TMP.ppm > {texture}");
        let _ = writeln!(
            run,
            "pnmscale -xsize={} TMP.ppm | ppmtobmp > {small}",
            layout.small_size
        );
        run.push('\n');
        Ok(())
    }

    fn fetch(&mut self, set: &FetchSet) -> Result<(), TileplanError> {
        if set.is_empty() {
            tracing::debug!("fetch script has nothing to download");
        }
        for record in set.iter() {
            let _ = writeln!(
                self.fetch,
                "wget '{}/{}.zip'",
                self.layout.fetch_url, record.name
            );
            let _ = writeln!(self.fetch, "./do-mrsid {}.zip", record.name);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TileplanError> {
        if self.dry_run {
            return Ok(());
        }
        write_atomic(&self.layout.run_script, self.run.as_bytes())?;
        write_atomic(&self.layout.fetch_script, self.fetch.as_bytes())?;
        tracing::info!(
            run = %self.layout.run_script,
            fetch = %self.layout.fetch_script,
            "wrote scripts"
        );
        Ok(())
    }
}

/// Formats like C's `%.12g`: 12 significant digits, trailing zeros trimmed.
pub fn format_g(value: f64) -> String {
    const PRECISION: i32 = 12;
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let mantissa = trim_fraction(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.abs());
    }

    let decimals = (PRECISION - 1 - exponent).max(0) as usize;
    trim_fraction(&format!("{value:.decimals$}")).to_string()
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}
