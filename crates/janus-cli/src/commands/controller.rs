//! Direct controller queries that bypass the cached config

use anyhow::Result;
use serde_json::Value;

use janus_client::{Client, ResourceType, Response};

use super::check;
use crate::output::{format_nodes, format_profiles, pretty, print_info, print_success};

fn print_body(resp: &Response) {
    match resp.json() {
        Ok(Some(Value::String(text))) => println!("{text}"),
        Ok(Some(value)) => println!("{}", pretty(&value)),
        Ok(None) => {}
        Err(_) => println!("{}", resp.text()),
    }
}

pub async fn nodes_command(client: &Client, name: Option<&str>, refresh: bool) -> Result<()> {
    let resp = client.nodes(name, None, refresh).await?;
    check(&resp, "nodes")?;
    if name.is_some() {
        print_body(&resp);
        return Ok(());
    }
    println!("{}", format_nodes(&resp.nodes()?));
    Ok(())
}

pub async fn profiles_command(
    client: &Client,
    resource: Option<ResourceType>,
    name: Option<&str>,
    refresh: bool,
) -> Result<()> {
    let resp = client.profiles(resource, name, refresh).await?;
    check(&resp, "profiles")?;
    if name.is_some() {
        print_body(&resp);
        return Ok(());
    }
    println!("{}", format_profiles(&resp.profiles()?));
    Ok(())
}

pub async fn images_command(client: &Client, name: Option<&str>) -> Result<()> {
    let resp = client.images(name).await?;
    check(&resp, "images")?;
    print_body(&resp);
    Ok(())
}

/// Execute the logs command
///
/// Asks for both stdout and stderr of the container.
pub async fn logs_command(client: &Client, id: &str, node: &str, tail: Option<u32>) -> Result<()> {
    let mut params = vec![("stdout", "true".to_string()), ("stderr", "true".to_string())];
    if let Some(n) = tail {
        params.push(("tail", n.to_string()));
    }
    let resp = client.active_logs(id, node, &params).await?;
    check(&resp, "logs")?;
    print_body(&resp);
    Ok(())
}

pub async fn start_command(client: &Client, id: &str) -> Result<()> {
    let resp = client.start(id).await?;
    check(&resp, "start")?;
    print_success(&format!("Started session {id}"));
    Ok(())
}

pub async fn stop_command(client: &Client, id: &str) -> Result<()> {
    let resp = client.stop(id).await?;
    check(&resp, "stop")?;
    print_success(&format!("Stopped session {id}"));
    Ok(())
}

/// Print the base URL, or point the client somewhere else
pub fn url_command(client: &mut Client, url: Option<String>) {
    match url {
        Some(url) => {
            client.set_url(url);
            print_info(&format!("Controller URL set to {}", client.url()));
        }
        None => println!("{}", client.url()),
    }
}
