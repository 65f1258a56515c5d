use limber_core::auth::{SessionPersistence, SupabaseAuthClient};
use limber_core::AppConfig;

use crate::auth::SessionStore;
use crate::commands::common::build_remote;
use crate::error::CliError;

pub async fn run_login(config: &AppConfig, email: &str, password: &str) -> Result<(), CliError> {
    let remote = build_remote(config)?;
    let session = remote.auth().sign_in(email, password).await?;

    let email_label = session.user.email.as_deref().unwrap_or("(no email)");
    println!("Signed in as {email_label}");
    Ok(())
}

pub async fn run_logout(config: &AppConfig) -> Result<(), CliError> {
    let settings = config.supabase()?.ok_or(CliError::SyncNotConfigured)?;
    let store = SessionStore::for_project(&settings.url);
    let auth = SupabaseAuthClient::new(&settings.url, settings.anon_key, store.clone())?;

    if let Err(error) = auth.sign_out().await {
        tracing::warn!("Remote sign-out failed, clearing local session anyway: {error}");
        store.clear_session()?;
    }

    println!("Signed out");
    Ok(())
}
