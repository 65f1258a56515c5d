use std::path::Path;
use std::time::Duration;

use limber_core::{AppConfig, LocalStore, Registry, RemoteService, SyncEngine, SyncReport};

use crate::commands::common::{build_remote, now_label, open_store};
use crate::error::CliError;

pub async fn run_sync(
    config: &AppConfig,
    as_json: bool,
    watch: Option<u64>,
    db_path: &Path,
) -> Result<(), CliError> {
    let engine = SyncEngine::new(
        open_store(db_path)?,
        build_remote(config)?,
        Registry::standard()?,
    )
    .with_config(config.sync_config());

    let Some(seconds) = watch else {
        let report = engine.sync_all().await;
        print_report(&report, as_json)?;
        return if report.is_clean() {
            Ok(())
        } else {
            Err(CliError::SyncIncomplete(report.errors.len()))
        };
    };

    watch_loop(&engine, Duration::from_secs(seconds.max(1)), as_json).await
}

async fn watch_loop<L: LocalStore, R: RemoteService>(
    engine: &SyncEngine<L, R>,
    period: Duration,
    as_json: bool,
) -> Result<(), CliError> {
    let mut ticker = tokio::time::interval(period);
    tracing::info!("Syncing every {}s; press Ctrl-C to stop", period.as_secs());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = engine.sync_all().await;
                print_report(&report, as_json)?;
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                return Ok(());
            }
        }
    }
}

fn print_report(report: &SyncReport, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    for line in format_report_lines(report) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "[{}] pushed {}, pulled {}",
        now_label(),
        report.pushed,
        report.pulled
    )];
    lines.extend(report.errors.iter().map(|error| format!("  error: {error}")));
    lines
}
