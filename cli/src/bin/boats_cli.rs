use std::path::{Path, PathBuf};

use boats::{BoatPipeline, SegmentationConfig};
use clap::{Parser, Subcommand};
use cli::{SceneDocument, load_config};
use color_eyre::eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect boats in a scene and write them as GeoJSON
    Segment {
        /// Path to the JSON scene document
        #[arg(short, long)]
        scene: PathBuf,
        /// Segmentation settings (.toml or .json), defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Path to save the GeoJSON feature collection
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the JSON schema of the configuration file
    Schema,
    /// Print the default configuration as TOML
    DefaultConfig,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Segment {
            scene,
            config,
            output,
        } => segment(scene, config.as_deref(), output)?,
        Commands::Schema => {
            let schema = SegmentationConfig::schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::DefaultConfig => {
            print!("{}", SegmentationConfig::default().to_toml()?);
        }
    }

    Ok(())
}

fn segment(scene_path: &Path, config_path: Option<&Path>, output: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = BoatPipeline::from_config(&config)?;
    info!("{}", pipeline.info());

    let image = SceneDocument::from_json_file(scene_path)?.into_image()?;
    if image.transform().is_identity() {
        warn!("Scene has no transform, polygons are in pixel coordinates");
    }
    let (width, height) = image.dimensions();
    info!(
        "Loaded scene {} ({}x{}, {} bands)",
        scene_path.display(),
        width,
        height,
        image.band_count()
    );

    let detection = pipeline.detect(&image)?;
    std::fs::write(output, detection.to_geojson_string()?)?;

    info!(
        "Found {} boats, GeoJSON written to {}",
        detection.boat_count(),
        output.display()
    );
    Ok(())
}
