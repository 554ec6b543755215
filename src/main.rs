use anyhow::Context;
use clap::Parser;
use product_etl::config::StoreKind;
use product_etl::utils::error::ErrorSeverity;
use product_etl::utils::{logger, validation::Validate};
use product_etl::{
    build_sources, CliConfig, DocumentStore, EtlEngine, EtlError, JsonFileStore, MemoryStore,
    PipelineConfig, RunReport,
};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting product-etl");

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e);
            return ExitCode::from(1);
        }
    };
    tracing::debug!("Pipeline config: {:?}", config);

    if cli.dry_run {
        print_plan(&config);
        return ExitCode::SUCCESS;
    }

    match execute(&config).await {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            ExitCode::from(run_exit_code(&e))
        }
    }
}

/// Only an unusable store maps to 3; anything else that stops a run is 1.
fn run_exit_code(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<EtlError>().map(EtlError::severity) {
        Some(ErrorSeverity::Critical) => 3,
        _ => 1,
    }
}

fn load_config(cli: &CliConfig) -> anyhow::Result<PipelineConfig> {
    let config = cli.pipeline_config().context("Failed to load pipeline configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn execute(config: &PipelineConfig) -> anyhow::Result<RunReport> {
    let result = match config.store.r#type {
        StoreKind::Json => {
            let store = JsonFileStore::new(config.store_path(), config.database());
            run(config, store).await
        }
        StoreKind::Memory => run(config, MemoryStore::new()).await,
    };
    result.with_context(|| format!("ETL run into collection '{}' failed", config.collection()))
}

fn report_error(e: &anyhow::Error) {
    tracing::error!("❌ {:#}", e);
    match e.downcast_ref::<EtlError>() {
        Some(etl) => {
            tracing::error!("Category: {:?}, Severity: {:?}", etl.category(), etl.severity());
            eprintln!("❌ {}", etl.user_friendly_message());
            eprintln!("💡 {}", etl.recovery_suggestion());
        }
        None => eprintln!("❌ {:#}", e),
    }
}

async fn run<S: DocumentStore>(config: &PipelineConfig, store: S) -> Result<RunReport, EtlError> {
    let engine = EtlEngine::new_with_monitoring(
        build_sources(&config.sources),
        store,
        config.run_options(),
        config.monitoring_enabled(),
    );
    engine.run().await
}

fn print_plan(config: &PipelineConfig) {
    println!("🔍 Dry run: {}", config.pipeline.name);
    for source in &config.sources {
        let target = source
            .endpoint
            .as_deref()
            .or(source.path.as_deref())
            .unwrap_or("built-in data");
        println!("  source {:<12} {:?} ({})", source.name, source.r#type, target);
    }
    println!("  dedupe partitions: {}", config.partitions());
    println!(
        "  store: {:?} {}/{}/{} (full refresh: {})",
        config.store.r#type,
        config.store_path(),
        config.database(),
        config.collection(),
        config.full_refresh()
    );
}

fn print_report(report: &RunReport) {
    println!(
        "✅ Extracted {} records ({} rejected), {} after deduplication",
        report.extracted, report.rejected, report.deduplicated
    );
    for failure in &report.source_failures {
        println!(
            "⚠️  Source '{}' failed after {} records: {}",
            failure.source_name, failure.records_kept, failure.message
        );
    }
    if let Some(summary) = &report.summary {
        println!(
            "📁 Inserted {}, updated {}, unchanged {}, failed {}",
            summary.inserted, summary.updated, summary.unchanged, summary.failed
        );
    }
}
