use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use tileplan::app::{App, LogProgress, ProgressSink, TileSelection};
use tileplan::catalog::{CatalogSources, IgnoreList, load_catalog};
use tileplan::config::{ResolvedSettings, SettingsLoader};
use tileplan::emit::{ScriptLayout, ScriptSink};
use tileplan::error::TileplanError;
use tileplan::grid::{GridConfig, GridGeometry};
use tileplan::output::{HumanOutput, JsonOutput, OutputMode};
use tileplan::planner::DirPresence;
use tileplan::projection::ProjectionEngine;

#[derive(Parser)]
#[command(name = "tileplan")]
#[command(about = "Plan texture tile generation from MassGIS orthoimagery")]
#[command(version, author)]
struct Cli {
    /// Tiles to plan, as hhvv (e.g. 1208). Defaults to the configured range.
    tiles: Vec<String>,

    /// Settings file (default: ./tileplan.json, then the user config dir)
    #[arg(long)]
    config: Option<String>,

    /// 3DEM grid header
    #[arg(long)]
    header: Option<Utf8PathBuf>,

    /// Directory holding the source imagery
    #[arg(long)]
    source_dir: Option<Utf8PathBuf>,

    /// Read footprints from the *.tfw world files in the source directory
    #[arg(long)]
    world_files: bool,

    /// Don't read the catalog index
    #[arg(long)]
    no_index: bool,

    /// Plan without creating directories or writing scripts
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<TileplanError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TileplanError) -> u8 {
    if error.is_config() {
        2
    } else if error.is_catalog() {
        3
    } else {
        1
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let mut settings = SettingsLoader::resolve(cli.config.as_deref())?;
    apply_overrides(&mut settings, &cli);
    let selection = TileSelection::parse(cli.tiles.as_slice())?;

    let grid = GridConfig::load(settings.header.as_std_path())?;
    let geometry = GridGeometry::new(&grid);
    tracing::info!(
        tiles_wide = geometry.tiles_wide,
        tiles_high = geometry.tiles_high,
        "grid loaded"
    );

    let sources = CatalogSources {
        index_file: settings
            .use_index
            .then(|| settings.index_file.clone().into_std_path_buf()),
        world_file_dir: settings
            .world_files
            .then(|| settings.source_dir.clone().into_std_path_buf()),
        ignore: IgnoreList::new(settings.ignore.iter().cloned()),
        strict: settings.strict_catalog,
    };
    let catalog = load_catalog(&sources)?;

    let cwd = std::env::current_dir().into_diagnostic()?;
    let cwd = Utf8PathBuf::from_path_buf(cwd)
        .map_err(|path| miette::miette!("working directory is not UTF-8: {}", path.display()))?;
    let mut sink = ScriptSink::new(ScriptLayout::from_settings(&settings, &cwd), cli.dry_run);

    let presence = DirPresence::new(settings.source_dir.as_std_path());
    let app = App::new(
        settings,
        geometry,
        ProjectionEngine::massgis(),
        catalog,
        presence,
    );

    let progress: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &LogProgress,
    };
    let report = app.run(&selection, &mut sink, progress)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic()?,
        OutputMode::Human => HumanOutput::print_report(&report, cli.dry_run).into_diagnostic()?,
    }
    Ok(())
}

fn apply_overrides(settings: &mut ResolvedSettings, cli: &Cli) {
    if let Some(header) = &cli.header {
        settings.header = header.clone();
    }
    if let Some(source_dir) = &cli.source_dir {
        // An index inside the old source dir follows it.
        if let Ok(relative) = settings.index_file.strip_prefix(&settings.source_dir) {
            settings.index_file = source_dir.join(relative);
        }
        settings.source_dir = source_dir.clone();
    }
    if cli.world_files {
        settings.world_files = true;
    }
    if cli.no_index {
        settings.use_index = false;
    }
}
