//! carval-vs (Valuation Service) - vehicle market valuation and claim cost
//! estimation.
//!
//! Resolves vehicle values through an ordered fallback chain (stored
//! valuation → live market scrape → static depreciation model) and turns
//! resolved values into claim cost estimates via static business rules.

use anyhow::{bail, Context, Result};
use carval_common::config::{resolve_root_folder, ensure_root_folder, ScrapeConfig, TomlConfig};
use carval_common::rules::BusinessRules;
use carval_common::types::{ClaimInput, VehicleGroup};
use carval_vs::claims;
use carval_vs::db::specifications;
use carval_vs::jobs;
use carval_vs::scrapers::{
    AutotraderSource, CarGurusSource, CarsComSource, ListingSource,
};
use carval_vs::services::VinDecoder;
use carval_vs::valuation::{ResolvedValuation, ValuationRequest, ValuationResolver};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "carval-vs", version, about = "Vehicle market valuation service")]
struct Cli {
    /// Root data folder (overrides CARVAL_ROOT and the compiled default)
    #[arg(long, global = true)]
    root_folder: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape listings for a vehicle group and refresh its valuation
    Scrape {
        #[arg(long)]
        make: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        year: i64,
        /// Sources to query (defaults to the configured list, in order)
        #[arg(long = "source")]
        sources: Vec<String>,
        #[arg(long)]
        max_results: Option<u32>,
    },

    /// Resolve a market value for a vehicle group
    Value {
        #[arg(long)]
        make: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        year: i64,
        #[arg(long)]
        mileage: Option<i64>,
        /// Two-letter state code for regional adjustment
        #[arg(long)]
        state: Option<String>,
    },

    /// Estimate a claim cost end-to-end
    Estimate {
        #[arg(long)]
        vin: Option<String>,
        #[arg(long)]
        make: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        year: Option<i64>,
        #[arg(long)]
        mileage: Option<i64>,
        /// Incident severity label, e.g. "Major Damage"
        #[arg(long)]
        severity: String,
        #[arg(long)]
        collision_type: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long, default_value_t = 0)]
        injuries: u32,
    },

    /// Decode a VIN into vehicle attributes
    Decode {
        #[arg(long)]
        vin: Option<String>,
        /// List known models for a make instead of decoding
        #[arg(long)]
        models_for: Option<String>,
    },

    /// Purge listings past the retention window
    Cleanup {
        #[arg(long)]
        retention_days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let root_folder = resolve_root_folder(cli.root_folder.as_deref());
    ensure_root_folder(&root_folder)?;
    let config = TomlConfig::load(&root_folder)?;

    // Tracing: RUST_LOG wins, the TOML logging level is the fallback
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting Carval Valuation Service (carval-vs) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    info!("Root folder: {}", root_folder.display());

    let db_path = config.database_path(&root_folder);
    let pool = carval_common::db::init_database(&db_path).await?;

    let rules = BusinessRules::load(&config.rules_path(&root_folder))?;

    match cli.command {
        Command::Scrape {
            make,
            model,
            year,
            sources,
            max_results,
        } => {
            let mut scrape_cfg = config.scrape.clone();
            if !sources.is_empty() {
                scrape_cfg.sources = sources;
            }
            if let Some(max) = max_results {
                scrape_cfg.max_results = max;
            }

            let group = VehicleGroup::new(make, model, year);
            cmd_scrape(&pool, &config, &scrape_cfg, &group).await?;
        }

        Command::Value {
            make,
            model,
            year,
            mileage,
            state,
        } => {
            let request = ValuationRequest {
                group: VehicleGroup::new(make, model, year),
                mileage,
                state,
            };
            let resolver = build_resolver(&config, rules)?;
            let resolved = resolver.resolve(&pool, &request).await;
            print_resolved(&request.group, &resolved);
        }

        Command::Estimate {
            vin,
            make,
            model,
            year,
            mileage,
            severity,
            collision_type,
            state,
            injuries,
        } => {
            let claim = ClaimInput {
                vin,
                make,
                model,
                year,
                mileage,
                severity,
                collision_type,
                state,
                injuries,
            };

            let decoder =
                VinDecoder::new(Duration::from_secs(config.valuation.decode_timeout_secs))
                    .map_err(|e| anyhow::anyhow!("decoder init: {}", e))?;
            let resolver = build_resolver(&config, rules.clone())?;

            let outcome =
                claims::estimate_claim(&pool, Some(&decoder), &resolver, &rules, &claim).await?;

            print_resolved(&outcome.group, &outcome.valuation);
            println!();
            println!(
                "Predicted claim cost: ${:.0}",
                outcome.estimate.predicted_cost
            );
            for line in &outcome.estimate.reasoning {
                println!("  - {}", line);
            }
        }

        Command::Decode { vin, models_for } => {
            cmd_decode(&pool, &config, vin.as_deref(), models_for.as_deref()).await?;
        }

        Command::Cleanup { retention_days } => {
            let days = retention_days.unwrap_or(config.valuation.retention_days);
            let purged = jobs::run_cleanup(&pool, days).await?;
            println!("Purged {} listings older than {} days", purged, days);
        }
    }

    Ok(())
}

/// Instantiate the configured listing sources, in configured order
fn build_sources(scrape_cfg: &ScrapeConfig) -> Result<Vec<Arc<dyn ListingSource>>> {
    let mut sources: Vec<Arc<dyn ListingSource>> = Vec::new();

    for name in &scrape_cfg.sources {
        match name.as_str() {
            "cars_com" => sources.push(Arc::new(
                CarsComSource::new(scrape_cfg).context("cars_com client")?,
            )),
            "autotrader" => sources.push(Arc::new(
                AutotraderSource::new(scrape_cfg).context("autotrader client")?,
            )),
            "cargurus" => sources.push(Arc::new(
                CarGurusSource::new(scrape_cfg).context("cargurus client")?,
            )),
            other => warn!("Unknown listing source in configuration: {}", other),
        }
    }

    if sources.is_empty() {
        warn!("No usable listing sources configured; live scrape stage will be skipped");
    }

    Ok(sources)
}

fn build_resolver(config: &TomlConfig, rules: BusinessRules) -> Result<ValuationResolver> {
    let sources = build_sources(&config.scrape)?;
    Ok(ValuationResolver::new(
        config.valuation.clone(),
        config.scrape.clone(),
        rules,
        sources,
    ))
}

async fn cmd_scrape(
    pool: &SqlitePool,
    config: &TomlConfig,
    scrape_cfg: &ScrapeConfig,
    group: &VehicleGroup,
) -> Result<()> {
    let sources = build_sources(scrape_cfg)?;
    let report =
        jobs::run_scrape_job(pool, &sources, group, scrape_cfg, &config.valuation, false).await?;

    println!("Scrape job for {}:", group.label());
    for source in &report.per_source {
        match &source.error {
            Some(error) => println!(
                "  {}: {} ({})",
                source.source,
                source.outcome.as_str(),
                error
            ),
            None => println!(
                "  {}: {} listings, {} skipped",
                source.source, source.found, source.skipped
            ),
        }
    }

    match &report.valuation {
        Some(valuation) => println!(
            "Valuation refreshed: mean ${:.0}, median ${:.0}, retail ${:.0} (n={})",
            valuation.mean_price,
            valuation.median_price,
            valuation.retail_price,
            valuation.sample_size
        ),
        None => println!("No usable sample; valuation unchanged"),
    }

    // Opportunistic retention pass while we hold the database anyway
    jobs::run_cleanup(pool, config.valuation.retention_days).await?;

    Ok(())
}

async fn cmd_decode(
    pool: &SqlitePool,
    config: &TomlConfig,
    vin: Option<&str>,
    models_for: Option<&str>,
) -> Result<()> {
    let decoder = VinDecoder::new(Duration::from_secs(config.valuation.decode_timeout_secs))
        .map_err(|e| anyhow::anyhow!("decoder init: {}", e))?;

    if let Some(make) = models_for {
        let models = decoder
            .models_for_make(make)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        println!("{} models known for {}:", models.len(), make);
        for model in models {
            println!("  {}", model);
        }
        return Ok(());
    }

    let Some(vin) = vin else {
        bail!("pass --vin to decode, or --models-for to list models for a make");
    };

    let spec = decoder
        .decode(vin)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    specifications::insert_ignore(pool, &spec).await?;

    println!("{} {} {}", spec.year, spec.make, spec.model);
    if let Some(trim) = &spec.trim {
        println!("  Trim: {}", trim);
    }
    if let Some(body) = &spec.body_type {
        println!("  Body: {}", body);
    }

    Ok(())
}

fn print_resolved(group: &VehicleGroup, resolved: &ResolvedValuation) {
    println!("Vehicle: {}", group.label());
    println!("Estimated value: ${:.0}", resolved.value);
    println!(
        "Provenance: {}  Confidence: {}{}",
        resolved.provenance.as_str(),
        resolved.confidence.as_str(),
        resolved
            .sample_size
            .map(|n| format!("  Sample: {}", n))
            .unwrap_or_default()
    );
    for note in &resolved.notes {
        println!("  - {}", note);
    }
}
