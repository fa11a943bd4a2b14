//! NeuroFeel Demo Client - Main Entry Point

use clap::{Parser, Subcommand};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use neurofeel_client::api::{commands, render, AppContext};
use neurofeel_client::constants::{APP_NAME, APP_VERSION};
use neurofeel_client::logic::backend::{
    Dimension, Direction, PredictionRequest, TargetDimension, WesadPredictionRequest,
};
use neurofeel_client::logic::prediction::PacingPolicy;
use neurofeel_client::logic::ranking::DEFAULT_TOP_FEATURES;
use neurofeel_client::ClientConfig;

#[derive(Parser)]
#[command(name = "neurofeel", version, about = "NeuroFeel emotion recognition demo client")]
struct Cli {
    /// Prediction API base URL
    #[arg(long, global = true, env = "NEUROFEEL_API_URL")]
    api_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Model API health
    Health,
    /// Sample pool sizes of both datasets
    Samples,
    /// Feature values and labels of one demo sample
    Sample {
        direction: Direction,
        index: u32,
    },
    /// Predict one cross-dataset sample
    Predict {
        direction: Direction,
        #[arg(default_value_t = 0)]
        index: u32,
        #[arg(long, default_value = "both")]
        target: TargetDimension,
    },
    /// Predict one WESAD subject sample with all four models
    PredictWesad {
        subject: u32,
        #[arg(long, default_value_t = 0)]
        sample: u32,
    },
    /// Paced batch prediction over a direction's sample pool
    Batch {
        direction: Direction,
        /// Maximum samples to predict
        #[arg(long)]
        limit: Option<usize>,
        /// Pause between requests in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
    },
    /// Thresholds and estimators of the cross-dataset models
    Models,
    /// Evaluation overview of all models
    Overview,
    /// Confusion matrices of one target
    Confusion {
        #[arg(long, default_value = "arousal")]
        target: Dimension,
    },
    /// Domain gap projection of one target
    DomainGap {
        #[arg(long, default_value = "arousal")]
        target: Dimension,
    },
    /// Feature mapping ranked by importance
    Features {
        #[arg(long, default_value = "arousal")]
        target: Dimension,
        #[arg(long, default_value_t = DEFAULT_TOP_FEATURES)]
        top: usize,
    },
    /// Class distribution per dataset
    Distribution,
    /// WESAD subjects with test data
    Subjects,
    /// WESAD model evaluation for one subject, or across all subjects
    Evaluate {
        #[arg(long)]
        subject: Option<u32>,
    },
    /// Scripted session: single predictions, then the history
    Demo {
        /// Predictions per direction
        #[arg(long, default_value_t = 3)]
        count: u32,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!("Starting {} client v{}", APP_NAME, APP_VERSION);

    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let mut config = ClientConfig::default();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(secs) = cli.timeout {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Command::Batch { limit, pacing_ms, .. } = &cli.command {
        if let Some(limit) = limit {
            config.batch_limit = *limit;
        }
        if let Some(ms) = pacing_ms {
            config.pacing = PacingPolicy {
                interval: Duration::from_millis(*ms),
                ..config.pacing
            };
        }
    }

    let ctx = AppContext::new(config).map_err(|e| e.to_string())?;
    let json = cli.json;

    match cli.command {
        Command::Health => render::print(&commands::health(&ctx).await?, json),
        Command::Samples => render::print(&commands::samples(&ctx).await?, json),
        Command::Sample { direction, index } => {
            render::print(&commands::sample_details(&ctx, direction, index).await?, json)
        }
        Command::Predict {
            direction,
            index,
            target,
        } => {
            let request = PredictionRequest {
                direction,
                sample_index: index,
                target_dimension: target,
            };
            render::print(&commands::predict(&ctx, request).await?, json)
        }
        Command::PredictWesad { subject, sample } => {
            let request = WesadPredictionRequest {
                subject_id: subject,
                sample_index: sample,
            };
            render::print(&commands::predict_wesad(&ctx, request).await?, json)
        }
        Command::Batch { direction, .. } => {
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Interrupted, stopping batch");
                    trigger.cancel();
                }
            });
            render::print(&commands::batch(&ctx, direction, &cancel).await?, json)
        }
        Command::Models => render::print(&commands::models(&ctx).await?, json),
        Command::Overview => render::print(&commands::overview(&ctx).await?, json),
        Command::Confusion { target } => {
            render::print(&commands::confusion_matrices(&ctx, target).await?, json)
        }
        Command::DomainGap { target } => render::print(&commands::domain_gap(&ctx, target).await?, json),
        Command::Features { target, top } => {
            render::print(&commands::feature_mapping(&ctx, target, top).await?, json)
        }
        Command::Distribution => render::print(&commands::class_distribution(&ctx).await?, json),
        Command::Subjects => render::print(&commands::wesad_subjects(&ctx).await?, json),
        Command::Evaluate { subject } => render::print(&commands::evaluate(&ctx, subject).await?, json),
        Command::Demo { count } => render::print(&commands::demo(&ctx, count).await?, json),
    }
}
