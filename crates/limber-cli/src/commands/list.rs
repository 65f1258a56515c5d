use std::path::Path;

use limber_core::LocalStore;

use crate::cli::Collection;
use crate::commands::common::{format_record_lines, open_store, record_to_list_item};
use crate::error::CliError;

pub async fn run_list(
    collection: Collection,
    pending_only: bool,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let mut records = if pending_only {
        store.scan_unsynced(collection.name()).await?
    } else {
        store.scan_all(collection.name()).await?
    };
    records.reverse();
    records.truncate(limit);

    if as_json {
        let items = records.iter().map(record_to_list_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if records.is_empty() {
        println!("No {} entries.", collection.name());
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}
