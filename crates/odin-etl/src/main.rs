//! ODIN ETL - loads the mobility survey into PostgreSQL

use anyhow::Context;
use clap::Parser;
use odin_common::logging::{init_logging, ConsoleStream, LogConfig, LogLevel, LogOutput};
use odin_etl::cli::{Cli, Command};
use odin_etl::config::{EtlConfig, SourceConfig};
use odin_etl::{db, EtlPipeline, PgUpsertTarget, RunResult};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::signal;
use tracing::{error, info, warn};

/// Conventional exit status after SIGINT
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_loaded = match &cli.env_file {
        Some(path) => dotenvy::from_path(path).map(|_| ()),
        None => dotenvy::dotenv().map(|_| ()),
    };

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .console_stream(ConsoleStream::Stderr)
        .log_file_prefix("odin-etl")
        .build();

    // Environment variables take precedence
    let log_config = match log_config.clone().merge_env() {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Ignoring invalid logging configuration: {}", e);
            log_config
        },
    };

    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        },
    };

    if let Err(e) = env_loaded {
        match &cli.env_file {
            Some(path) => {
                error!("Failed to read env file {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            },
            None => tracing::debug!("No .env file loaded: {}", e),
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let code = runtime.block_on(supervise(cli.command));
    // An interrupted check may still be running on the blocking pool
    runtime.shutdown_background();
    code
}

/// Run `command` until it finishes or Ctrl+C arrives
async fn supervise(command: Command) -> ExitCode {
    let loading = AtomicBool::new(false);

    tokio::select! {
        biased;

        _ = interrupted() => {
            if loading.load(Ordering::Relaxed) {
                warn!(
                    "Interrupted during load; the table being written was rolled back, \
                     tables committed earlier in the run are kept"
                );
            } else {
                warn!("Interrupted before loading; nothing was written");
            }
            ExitCode::from(EXIT_INTERRUPTED)
        }
        result = execute(command, &loading) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("ETL failed: {:#}", e);
                ExitCode::FAILURE
            },
        },
    }
}

/// Run the command; `loading` is set once database writes begin
async fn execute(command: Command, loading: &AtomicBool) -> anyhow::Result<()> {
    match command {
        Command::Check => {
            let source = SourceConfig::from_env().context("Invalid source configuration")?;
            let validated = EtlPipeline::new(source).check_async().await??;
            info!(
                dimensions = validated.dimensions().len(),
                fact_rows = validated.facts().len(),
                "Check passed; nothing was written"
            );
        },
        Command::Run { json } => {
            let config = EtlConfig::from_env().context("Invalid configuration")?;
            info!(database = ?config.database, "Starting ETL run");

            let validated = EtlPipeline::new(config.source.clone()).check_async().await??;

            loading.store(true, Ordering::Relaxed);
            let pool = db::create_pool(&config.database)
                .await
                .context("Failed to connect to database")?;

            let loaded = async {
                db::health_check(&pool).await.context("Database health check failed")?;
                let target = PgUpsertTarget::new(pool.clone(), config.database.schema.clone());
                Ok::<_, anyhow::Error>(validated.load(&target).await?)
            }
            .await;

            pool.close().await;
            let result = loaded?;

            log_summary(&result);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        },
    }

    Ok(())
}

fn log_summary(result: &RunResult) {
    for (table, rows) in result.dimensions_loaded() {
        info!(table = %table, rows, "Loaded dimension");
    }
    info!(
        total_dimensions = result.total_dimensions(),
        facts = result.facts_loaded(),
        "ETL run completed"
    );
}

async fn interrupted() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
