//! Status command handler

use anyhow::Result;

use doctrail_core::{Config, DocumentKind, DocumentStore};

use crate::output::{Output, OutputFormat};

/// Show status information
pub async fn show(store: &DocumentStore, config: &Config, output: &Output) -> Result<()> {
    let client = store.remote_client();
    let endpoint = client.as_ref().map(|c| c.config().endpoint.clone());
    let user = store.current_user().await;
    let forward = store
        .get_filtered(|d| d.kind == DocumentKind::Forward)
        .len();
    let received = store.len() - forward;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "status": store.status().as_str(),
                    "remote": {
                        "enabled": client.is_some(),
                        "endpoint": endpoint,
                        "user": user.as_ref().map(|u| &u.id),
                        "email": user.as_ref().and_then(|u| u.email.clone()),
                    },
                    "storage": {
                        "data_dir": config.data_dir,
                        "documents_file": store.cache().documents_path(),
                    },
                    "counts": {
                        "forward": forward,
                        "received": received,
                        "total": store.len()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.status());
        }
        OutputFormat::Human => {
            println!("Doctrail Status");
            println!("===============");
            println!();
            println!("Sync:");
            println!("  Status:   {}", store.status());
            match endpoint {
                Some(ref url) => println!("  Remote:   {}", url),
                None => println!("  Remote:   (not configured)"),
            }
            if client.is_some() {
                match user {
                    Some(ref user) => println!(
                        "  User:     {}",
                        user.email.as_deref().unwrap_or(&user.id)
                    ),
                    None => println!("  User:     (signed out)"),
                }
            }
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!();
            println!("Contents:");
            println!("  Forward:  {}", forward);
            println!("  Received: {}", received);
        }
    }

    Ok(())
}
