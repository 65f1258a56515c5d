use std::path::Path;

use limber_core::LocalStore;

use crate::cli::Collection;
use crate::commands::common::{open_store, resolve_fields};
use crate::error::CliError;

pub async fn run_add(
    collection: Collection,
    fields: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let record = collection.new_record(resolve_fields(fields)?)?;

    let store = open_store(db_path)?;
    let record = store.insert(collection.name(), record).await?;

    println!("{}", record.stable_id);
    Ok(())
}
