use limber_core::sync::registry::REMOTE_ID_COLUMN;
use limber_core::{AppConfig, Registry};

use crate::error::CliError;

pub fn run_check(config: &AppConfig) -> Result<(), CliError> {
    let registry = Registry::standard()?;
    for line in format_registry_lines(&registry) {
        println!("{line}");
    }

    match config.supabase()? {
        Some(settings) => println!("Remote: {}", settings.url),
        None => println!("Remote: not configured (local only)"),
    }
    let sync = config.sync_config();
    println!(
        "Sync: timeout {}s, push batch {}, pull page {}",
        sync.remote_timeout.as_secs(),
        sync.push_batch_size,
        sync.pull_page_size
    );
    Ok(())
}

pub fn format_registry_lines(registry: &Registry) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in registry.entries() {
        lines.push(format!(
            "{} -> {} (keyed on {REMOTE_ID_COLUMN})",
            entry.local_name, entry.remote_name
        ));
        for &field in entry.fields {
            if entry.is_transmitted(field) {
                lines.push(format!("    {field} -> {}", entry.remote_field(field)));
            } else {
                lines.push(format!("    {field} (local only)"));
            }
        }
    }
    lines
}
