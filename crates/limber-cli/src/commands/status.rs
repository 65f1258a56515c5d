use std::path::Path;

use limber_core::auth::SessionPersistence;
use limber_core::AppConfig;
use serde::Serialize;

use crate::auth::SessionStore;
use crate::commands::common::open_store;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct StatusReport {
    sync_configured: bool,
    signed_in_as: Option<String>,
    pending: Vec<PendingCount>,
}

#[derive(Debug, Serialize)]
struct PendingCount {
    collection: String,
    records: usize,
}

pub async fn run_status(config: &AppConfig, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let pending = store
        .pending_counts()
        .await?
        .into_iter()
        .map(|(collection, records)| PendingCount {
            collection,
            records,
        })
        .collect::<Vec<_>>();

    let project = config.supabase()?;
    let signed_in_as = match &project {
        Some(settings) => SessionStore::for_project(&settings.url)
            .load_session()?
            .map(|session| session.user.email.unwrap_or(session.user.id)),
        None => None,
    };

    let report = StatusReport {
        sync_configured: project.is_some(),
        signed_in_as,
        pending,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match (report.sync_configured, &report.signed_in_as) {
        (false, _) => println!("Sync: not configured"),
        (true, None) => println!("Sync: configured, not signed in"),
        (true, Some(label)) => println!("Sync: signed in as {label}"),
    }
    if report.pending.is_empty() {
        println!("Nothing waiting to be pushed.");
    } else {
        for count in &report.pending {
            println!("{:<16} {} pending", count.collection, count.records);
        }
    }
    Ok(())
}
