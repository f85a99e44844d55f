//! Command line front end of the island connectivity analysis

mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lts_connect_core::{
    loading::{gaps_to_geojson, islands_to_geojson, write_feature_collection},
    prelude::*,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use settings::{DEFAULT_CONFIG_PATH, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about = "Low-stress island connectivity analysis", long_about = None)]
struct Args {
    /// Alternate configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze candidate segments, one per feature of the input
    Cx {
        /// Type of network: lts or sidewalk
        #[arg(long, default_value = "lts")]
        network_type: NetworkType,
        /// GeoJSON feature or feature collection of candidate lines
        #[arg(long, required_unless_present = "gap_ids", conflicts_with = "gap_ids")]
        geojson_path: Option<PathBuf>,
        /// Comma separated gap edge ids forming one candidate
        #[arg(long, value_delimiter = ',')]
        gap_ids: Option<Vec<EdgeId>>,
        /// Segment name when the features carry none
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "cli_user")]
        username: String,
        /// Highest comfortable stress level, ignored for sidewalks
        #[arg(long, default_value_t = 2)]
        highest_comfort_level: u8,
        /// Replace earlier segments of the same name
        #[arg(long)]
        overwrite: bool,
    },
    /// Build islands and gaps and export them as GeoJSON
    Islands {
        #[arg(long)]
        network_type: Option<NetworkType>,
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Remove every segment and derived geometry of one user
    DropUserData {
        #[arg(long)]
        username: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let settings = Settings::load(&args.config)?;

    match args.command {
        Commands::Cx {
            network_type,
            geojson_path,
            gap_ids,
            name,
            username,
            highest_comfort_level,
            overwrite,
        } => {
            let comfort_level = network_type
                .uses_stress()
                .then_some(highest_comfort_level);
            let input = match (geojson_path, gap_ids) {
                (Some(path), _) => CxInput::GeoJson(path),
                (None, Some(ids)) => CxInput::Gaps(ids),
                (None, None) => bail!("either --geojson-path or --gap-ids is required"),
            };
            cx(
                &settings,
                network_type,
                comfort_level,
                input,
                name,
                &username,
                overwrite,
            )
        }
        Commands::Islands {
            network_type,
            output,
        } => islands(&settings, network_type, &output),
        Commands::DropUserData { username } => drop_user_data(&settings, &username),
    }
}

enum CxInput {
    GeoJson(PathBuf),
    Gaps(Vec<EdgeId>),
}

fn cx(
    settings: &Settings,
    network: NetworkType,
    comfort_level: Option<u8>,
    input: CxInput,
    name: Option<String>,
    username: &str,
    overwrite: bool,
) -> Result<()> {
    let config = &settings.analysis;

    let mut sources = settings.networks(Some(network))?;
    let Some((_, source)) = sources.first_mut() else {
        bail!("no [networks.{network}] section in the configuration");
    };
    // only the requested level is needed for the analysis
    if let Some(level) = comfort_level {
        source.levels = vec![level];
    }
    let catalog = build_catalog(&sources, config).context("failed to prepare the network")?;
    let layers = load_layers(&settings.layers).context("failed to load attribute layers")?;

    let mut store = MemoryStore::open(&settings.store_path)?;

    #[cfg(feature = "crash-api")]
    let crash_api = settings
        .crash_api
        .as_ref()
        .map(|api| HttpIncidentSource::new(&api.url, api.timeout()))
        .transpose()?;
    #[cfg(not(feature = "crash-api"))]
    if settings.crash_api.is_some() {
        warn!("Built without the crash-api feature, crash statistics are unavailable");
    }

    let mut summaries = Vec::new();
    {
        let mut analyzer = Analyzer::new(&catalog, &layers, &mut store, config);
        #[cfg(feature = "crash-api")]
        if let Some(api) = &crash_api {
            analyzer = analyzer.with_incidents(api);
        }

        match input {
            CxInput::GeoJson(path) => {
                let default_name = name.unwrap_or_else(|| file_stem(&path));
                let template = SegmentRequest {
                    network,
                    geometry: geo::Geometry::LineString(geo::LineString::new(vec![])),
                    owner: username.to_string(),
                    name: String::new(),
                    comfort_level,
                    overwrite,
                };
                let requests = read_requests(&path, &template, &default_name)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                info!("Analyzing {} features from {}", requests.len(), path.display());

                for request in &requests {
                    match analyzer.analyze(request) {
                        Ok(summary) => summaries.push(summary),
                        Err(e @ Error::NameConflict { .. }) => {
                            warn!("{e}; pass --overwrite to replace it");
                        }
                        Err(e) => {
                            return Err(e)
                                .with_context(|| format!("analysis of {:?} failed", request.name));
                        }
                    }
                }
            }
            CxInput::Gaps(ids) => {
                let name = name.unwrap_or_else(|| {
                    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                    format!("gaps {}", ids.join(" "))
                });
                let summary = analyzer
                    .analyze_gaps(network, comfort_level, &ids, username, &name, overwrite)
                    .with_context(|| format!("analysis of {name:?} failed"))?;
                summaries.push(summary);
            }
        }
    }

    store
        .save(&settings.store_path)
        .context("failed to save the segment store")?;
    append_csv(&settings.results_csv, &summaries)?;
    if let Some(path) = &settings.results_geojson {
        write_geojson(path, store.results())?;
    }

    info!(
        "Analyzed {} segments, results in {}",
        summaries.len(),
        settings.results_csv.display()
    );
    Ok(())
}

fn islands(settings: &Settings, network: Option<NetworkType>, output: &Path) -> Result<()> {
    let sources = settings.networks(network)?;
    if sources.is_empty() {
        bail!("no network configured");
    }
    let catalog = build_catalog(&sources, &settings.analysis)?;
    std::fs::create_dir_all(output)?;

    for level in catalog.levels() {
        let tables = level.tables();
        let islands_path = output.join(format!("{}.geojson", tables.islands_table));
        write_feature_collection(&islands_path, &islands_to_geojson(level)?)?;
        info!(
            "Wrote {} islands to {}",
            level.islands.len(),
            islands_path.display()
        );

        if let Some(level_number) = tables.comfort_level {
            let gaps_path = output.join(format!("lts{level_number}gaps.geojson"));
            write_feature_collection(&gaps_path, &gaps_to_geojson(level)?)?;
            info!("Wrote {} gaps to {}", level.gaps.len(), gaps_path.display());
        }
    }
    Ok(())
}

fn drop_user_data(settings: &Settings, username: &str) -> Result<()> {
    let mut store = MemoryStore::open(&settings.store_path)?;
    let removed = store.delete_owner(username)?;
    store.save(&settings.store_path)?;
    info!("Removed {removed} segments of {username}");
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "segment".to_string())
}
