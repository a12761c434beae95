//! Remote mirror command handlers

use anyhow::{Context, Result};

use doctrail_core::{DocumentStore, LoadOutcome, RemoteConfig, StoreError, SyncStatus};

use crate::output::{Output, OutputFormat};
use crate::prompt::confirm;

/// Enable remote mirroring and reload
pub async fn set(
    store: &DocumentStore,
    endpoint: String,
    key: String,
    output: &Output,
) -> Result<()> {
    let outcome = store
        .set_config(RemoteConfig::new(endpoint.trim(), key.trim()))
        .await
        .context("Failed to configure remote mirror")?;

    output.success(&format!("Remote mirror set to {}", endpoint.trim()));
    match (outcome, store.status()) {
        (LoadOutcome::Remote, _) => {
            output.message(&format!("Loaded {} document(s) from remote", store.len()))
        }
        (_, SyncStatus::RemoteError) => {
            output.warn("Remote could not be reached; using the local cache")
        }
        _ => output.message("Sign in with `doctrail login` to start mirroring"),
    }
    Ok(())
}

/// Disable remote mirroring
pub fn clear(store: &DocumentStore, purge: bool, output: &Output) -> Result<()> {
    if purge && output.should_prompt() && !confirm("Also erase the local document cache?")? {
        println!("Cancelled.");
        return Ok(());
    }

    store
        .clear_config(purge)
        .context("Failed to clear remote settings")?;

    if purge {
        output.success("Remote mirroring disabled and local cache erased");
    } else {
        output.success("Remote mirroring disabled");
    }
    Ok(())
}

/// Fetch from the remote without changing anything
pub async fn test(store: &DocumentStore, output: &Output) -> Result<()> {
    match store.test_connection().await {
        Ok(count) => {
            match output.format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({"status": "success", "remote_documents": count})
                ),
                OutputFormat::Quiet => println!("{}", count),
                OutputFormat::Human => {
                    println!("✓ Connection ok ({} remote document(s))", count)
                }
            }
            Ok(())
        }
        Err(StoreError::NotAuthenticated) => {
            anyhow::bail!("Not signed in. Run `doctrail login` first.")
        }
        Err(StoreError::InvalidConfig(_)) => anyhow::bail!(
            "Remote mirroring is not configured. Set it with:\n  \
             doctrail remote set <endpoint> <key>"
        ),
        Err(e) => Err(e).context("Connection test failed"),
    }
}
