//! Sync and rm commands

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use janus_client::Client;

use super::check;
use crate::nav::Navigator;
use crate::output::{pretty, print_error, print_success, print_warning};
use crate::shell::Confirm;

/// Execute the sync command
///
/// `sync` refreshes both sections, reporting a failure of either one, and
/// returns to the root; `sync nodes`
/// and `sync active` refresh one. `sync active <id>` prints that session
/// without caching it.
pub async fn sync_command(client: &Client, nav: &mut Navigator, args: &[String]) -> Result<()> {
    let refresh = args.iter().any(|a| a == "refresh");

    match args.first().map(String::as_str) {
        Some("nodes") => sync_nodes(client, nav, refresh).await,
        Some("active") => match args.get(1).filter(|a| *a != "refresh") {
            Some(id) => {
                let resp = client.active(Some(id.as_str())).await?;
                check(&resp, "active")?;
                println!("{}", pretty(&resp.json()?.unwrap_or(Value::Null)));
                Ok(())
            }
            None => sync_active(client, nav).await,
        },
        _ => {
            // Each section is refreshed even when the other fails
            if let Err(e) = sync_nodes(client, nav, refresh).await {
                print_error(&e.to_string());
            }
            if let Err(e) = sync_active(client, nav).await {
                print_error(&e.to_string());
            }
            nav.cd("")?;
            Ok(())
        }
    }
}

async fn sync_nodes(client: &Client, nav: &mut Navigator, refresh: bool) -> Result<()> {
    let resp = client.nodes(None, None, refresh).await?;
    check(&resp, "nodes")?;
    let nodes = resp.json().context("nodes listing is not JSON")?;
    nav.set_section("nodes", nodes.unwrap_or_else(|| Value::Object(Map::new())));
    print_success("nodes OK");
    Ok(())
}

async fn sync_active(client: &Client, nav: &mut Navigator) -> Result<()> {
    let resp = client.active(None).await?;
    check(&resp, "active")?;
    let active = resp.json().context("active listing is not JSON")?;
    nav.set_section("active", active.unwrap_or_else(|| Value::Object(Map::new())));
    print_success("active OK");
    Ok(())
}

/// Execute the rm command
///
/// Only valid while the current path is `/active`. Deletes the session on
/// the controller, then drops it from the cached tree.
pub async fn rm_command(
    client: &Client,
    nav: &mut Navigator,
    key: Option<&str>,
    confirm: &mut dyn Confirm,
) -> Result<()> {
    let Some(key) = key else {
        print_error("Specify active session by number");
        return Ok(());
    };
    if nav.cwd().last().map(String::as_str) != Some("active") {
        print_error("No active sessions in current path, check /active");
        return Ok(());
    }
    if nav.child(key).is_none() {
        print_error(&format!("{key} is not an active session"));
        return Ok(());
    }

    if !confirm.confirm(&format!("Really remove session {key}")) {
        print_warning("Aborted");
        return Ok(());
    }

    println!("Removing session {key}");
    let resp = client.delete(key, false).await?;
    check(&resp, "delete")?;
    nav.remove(key);
    tracing::info!(session = %key, "session removed");
    Ok(())
}
