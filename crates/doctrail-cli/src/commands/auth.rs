//! Sign-in command handlers

use anyhow::{Context, Result};

use doctrail_core::{DocumentStore, StoreError};

use crate::output::Output;
use crate::prompt::prompt_required;

/// Sign in to the remote mirror and reload from it
pub async fn login(
    store: &DocumentStore,
    email: Option<String>,
    password: Option<String>,
    output: &Output,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt_required("Email")?,
    };
    let password = match password.or_else(|| std::env::var("DOCTRAIL_PASSWORD").ok()) {
        Some(password) => password,
        None => prompt_required("Password")?,
    };

    let user = match store.sign_in(email.trim(), &password).await {
        Ok(user) => user,
        Err(StoreError::InvalidConfig(_)) => anyhow::bail!(
            "Remote mirroring is not configured. Set it with:\n  \
             doctrail remote set <endpoint> <key>"
        ),
        Err(e) => return Err(e).context("Sign-in failed"),
    };

    output.success(&format!(
        "Signed in as {}",
        user.email.as_deref().unwrap_or(&user.id)
    ));
    output.message(&format!("{} document(s) available ({})", store.len(), store.status()));
    Ok(())
}

/// Sign out, optionally erasing the local cache
pub async fn logout(store: &DocumentStore, clear: bool, output: &Output) -> Result<()> {
    if clear {
        store
            .sign_out_and_clear()
            .await
            .context("Failed to sign out")?;
        output.success("Signed out and erased the local cache");
    } else {
        store.sign_out().await.context("Failed to sign out")?;
        output.success("Signed out");
    }
    Ok(())
}
