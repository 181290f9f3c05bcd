use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster_core::config::SyncConfig;
use roster_sync::{RunOutcome, SyncRunner};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster=info,roster_sync=info,roster_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let source = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: roster <input.csv>")?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://roster.db".to_string());

    let pool = roster_db::create_pool(&database_url)
        .await
        .context("failed to open database")?;
    roster_db::run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;
    tracing::info!(%database_url, "database ready");

    let runner = SyncRunner::new(pool, SyncConfig::from_env());
    let outcome = runner
        .run(&source)
        .await
        .context("run aborted by an unrecoverable database error")?;

    Ok(report(outcome))
}

/// Print the outcome and map it to the process exit code.
fn report(outcome: RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Completed(summary) => {
            println!(
                "Completed in {}s: {} new, {} updated, {} restored, {} rejected, {} removed",
                summary.elapsed().num_seconds(),
                summary.new,
                summary.updated,
                summary.restored,
                summary.rejected,
                summary.deleted,
            );
            ExitCode::SUCCESS
        }
        RunOutcome::FailedBeforeMutation { errors } => {
            eprintln!("Run failed before any change was made:");
            for error in errors {
                eprintln!("  - {error}");
            }
            ExitCode::FAILURE
        }
        RunOutcome::FailedDuringMutation { summary, error } => {
            eprintln!("Run failed mid-sync: {error}");
            eprintln!(
                "Applied before the failure: {} new, {} updated, {} restored",
                summary.new, summary.updated, summary.restored,
            );
            ExitCode::FAILURE
        }
    }
}
