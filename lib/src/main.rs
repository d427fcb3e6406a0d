use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use workout_perf::config::Settings;
use workout_perf::dataset::{synthetic, Dataset};
use workout_perf::service::PredictionService;
use workout_perf::store::ArtifactStore;
use workout_perf::trainer::TrainingPipeline;
use workout_perf::{http, logging};

#[derive(Parser)]
#[command(author, version, about = "Workout performance model: generate data, train, serve")]
struct Cli {
    /// TOML settings file
    #[arg(short, long, global = true, env = "WORKOUT_PERF_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic fitness log CSV
    Generate {
        /// Number of rows
        #[arg(long, default_value_t = synthetic::DEFAULT_ROWS)]
        rows: usize,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Output CSV path
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Train, evaluate and persist the model
    Train {
        /// Input CSV path
        #[arg(long)]
        data: Option<PathBuf>,
        /// Random seed for the split and the model
        #[arg(long)]
        seed: Option<u64>,
        /// Held-out fraction, in (0, 1)
        #[arg(long)]
        test_size: Option<f64>,
        /// Directory for the artifact and metrics
        #[arg(long)]
        artifact_dir: Option<PathBuf>,
    },
    /// Serve predictions over HTTP
    Serve {
        /// Directory holding the trained artifact
        #[arg(long)]
        artifact_dir: Option<PathBuf>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
}

fn generate(settings: &Settings, rows: usize) -> Result<()> {
    let data = synthetic::generate(rows, settings.training.seed)?;
    let path = &settings.training.data_path;
    data.write_csv(path)
        .with_context(|| format!("writing {}", path.display()))?;

    if let Some(summary) = data.summary() {
        info!(
            rows = summary.rows,
            performance_min = summary.performance.min,
            performance_max = summary.performance.max,
            path = %path.display(),
            "generated synthetic dataset"
        );
    }
    Ok(())
}

fn train(settings: &Settings) -> Result<()> {
    let path = &settings.training.data_path;
    let data = Dataset::from_csv_path(path)
        .with_context(|| format!("loading dataset {}", path.display()))?;

    let outcome = TrainingPipeline::new(settings.training_config())?.run(&data)?;
    let store = ArtifactStore::new(&settings.store.dir);
    store.save(&outcome.artifact, &outcome.report)?;

    print!("{}", outcome.report.rounded(3).to_text());
    info!(dir = %store.dir().display(), "training complete");
    Ok(())
}

async fn serve(settings: &Settings) -> Result<()> {
    let addr = settings.server.addr()?;
    // Load before binding: no artifact, no server.
    let service = PredictionService::new(ArtifactStore::new(&settings.store.dir))
        .load()
        .context("cannot start prediction service")?;

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    };
    let (_, server) = http::bind(service, addr, shutdown)?;
    server.await;
    Ok(())
}

impl Commands {
    /// Fold command-line overrides into the file settings.
    fn apply(&self, settings: &mut Settings) {
        match self {
            Commands::Generate { seed, data, .. } => {
                if let Some(seed) = seed {
                    settings.training.seed = *seed;
                }
                if let Some(data) = data {
                    settings.training.data_path = data.clone();
                }
            }
            Commands::Train {
                data,
                seed,
                test_size,
                artifact_dir,
            } => {
                if let Some(data) = data {
                    settings.training.data_path = data.clone();
                }
                if let Some(seed) = seed {
                    settings.training.seed = *seed;
                }
                if let Some(test_size) = test_size {
                    settings.training.test_size = *test_size;
                }
                if let Some(dir) = artifact_dir {
                    settings.store.dir = dir.clone();
                }
            }
            Commands::Serve { artifact_dir, port } => {
                if let Some(dir) = artifact_dir {
                    settings.store.dir = dir.clone();
                }
                if let Some(port) = port {
                    settings.server.port = *port;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.command.apply(&mut settings);
    settings.validate()?;
    logging::init(&settings.log_level)?;

    match cli.command {
        Commands::Generate { rows, .. } => generate(&settings, rows),
        Commands::Train { .. } => train(&settings),
        Commands::Serve { .. } => serve(&settings).await,
    }
}
