use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use permit_normalizer::app::normalize_use_case::NormalizeUseCase;
use permit_normalizer::app::ports::GeocoderPort;
use permit_normalizer::infra::{JsonFileOutput, NominatimGeocoder};
use permit_normalizer::observability::{init_logging, metrics};
use permit_normalizer::pipeline::output::schema_documentation;
use permit_normalizer::pipeline::processing::FieldMapper;
use permit_normalizer::{InputFormat, NormalizerConfig, Pipeline};

#[derive(Parser)]
#[command(name = "permit_normalizer")]
#[command(about = "Normalize raw construction permit records into a canonical schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a CSV or JSON permit dataset
    Normalize {
        /// Raw dataset to read
        #[arg(long)]
        input: PathBuf,
        /// Where to write the normalized JSON document
        #[arg(long, default_value = "normalized_permit_data.json")]
        output: PathBuf,
        /// Input format: auto, csv or json
        #[arg(long, default_value = "auto")]
        format: InputFormat,
        /// Only normalize the first N records
        #[arg(long)]
        limit: Option<usize>,
        /// TOML settings file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip the postal code lookup for records without a zip
        #[arg(long)]
        no_geocode: bool,
        /// Records normalized concurrently
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Print the canonical schema documentation
    Schema,
    /// Show the canonical key a raw column name maps to
    MapKey {
        raw: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let log_dir = std::env::var("PERMITS_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let _guard = init_logging(&log_dir);

    if let Ok(addr) = std::env::var("PERMITS_METRICS_ADDR") {
        match addr.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init(addr) {
                    warn!("Metrics exporter not started: {}", e);
                }
            }
            Err(e) => warn!("Ignoring invalid PERMITS_METRICS_ADDR '{}': {}", addr, e),
        }
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize {
            input,
            output,
            format,
            limit,
            config,
            no_geocode,
            concurrency,
        } => {
            let mut settings = NormalizerConfig::load(config.as_deref())
                .context("loading normalizer configuration")?;
            if no_geocode {
                settings.geocoding.enabled = false;
            }
            if let Some(concurrency) = concurrency {
                settings.concurrency = concurrency.max(1);
            }

            let geocoder: Option<Arc<dyn GeocoderPort>> = if settings.geocoding.enabled {
                Some(Arc::new(
                    NominatimGeocoder::new(&settings.geocoding)
                        .context("building geocoding client")?,
                ))
            } else {
                info!("Geocoding disabled; missing zip codes stay empty");
                None
            };

            let pipeline = Pipeline::new(settings, geocoder)?;
            let use_case = NormalizeUseCase::new(pipeline, Box::new(JsonFileOutput::new(&output)));

            match use_case.run(&input, format, limit).await {
                Ok(stats) => {
                    println!("\n📊 Processing Statistics:");
                    println!("   Total records: {}", stats.total_records);
                    println!("   Normalized records: {}", stats.normalized_records);
                    println!("   Errors: {}", stats.errors);
                    println!("   Warnings: {}", stats.warnings);
                    println!("   Zip codes filled: {}", stats.zip_codes_filled);
                    println!("   Geocoding failures: {}", stats.geocoding_failures);
                    println!("   Output file: {}", output.display());
                }
                Err(e) => {
                    error!("Normalization run failed: {:#}", e);
                    return Err(e);
                }
            }
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&schema_documentation())?);
        }
        Commands::MapKey { raw } => {
            println!("{}", FieldMapper::new().map_key(&raw));
        }
    }

    Ok(())
}
