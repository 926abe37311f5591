//! Commands that reach service containers over SSH

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use janus_core::types::scalar_string;

use crate::nav::Navigator;
use crate::output::print_info;

/// A service instance reachable over SSH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// Path of the instance below the current view
    pub label: String,
    pub host: String,
    pub port: String,
    /// `USER_NAME` of the request that created the instance
    pub user: Option<String>,
}

impl SshTarget {
    fn login(&self) -> String {
        let user = self.user.clone().unwrap_or_else(whoami::username);
        format!("{}@{}", user, self.host)
    }
}

/// Collect SSH targets below `view`, in document order.
///
/// An instance is any mapping carrying a host (`ssh_host` or `ctrl_host`)
/// and a port (`ssh_port` or `ctrl_port`).
pub fn ssh_targets(view: &Value) -> Vec<SshTarget> {
    let mut targets = Vec::new();
    collect(view, "", None, &mut targets);
    targets
}

fn collect(value: &Value, label: &str, user: Option<&str>, out: &mut Vec<SshTarget>) {
    let children: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => return,
    };

    let request_user = value
        .get("request")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find_map(|r| r.get("kwargs")?.get("USER_NAME")?.as_str());
    let user = request_user.or(user);

    let field = |a: &str, b: &str| value.get(a).or_else(|| value.get(b)).map(scalar_string);
    if let (Some(host), Some(port)) = (field("ssh_host", "ctrl_host"), field("ssh_port", "ctrl_port")) {
        out.push(SshTarget {
            label: label.trim_start_matches('/').to_string(),
            host,
            port,
            user: user.map(str::to_string),
        });
        return;
    }

    for (key, child) in children {
        if key == "request" {
            continue;
        }
        collect(child, &format!("{label}/{key}"), user, out);
    }
}

fn pick(nav: &Navigator, index: usize) -> Result<SshTarget> {
    let targets = ssh_targets(nav.current());
    match targets.into_iter().nth(index) {
        Some(t) => Ok(t),
        None => bail!("No SSH target {index} below {}, run 'ssh' to list them", nav.pwd()),
    }
}

/// Execute the ssh command
///
/// Without an index, lists the targets below the current path.
pub fn ssh_command(nav: &Navigator, index: Option<usize>) -> Result<()> {
    let Some(index) = index else {
        let targets = ssh_targets(nav.current());
        if targets.is_empty() {
            print_info("No SSH targets in current path");
        }
        for (i, t) in targets.iter().enumerate() {
            println!("[{i}] {}\t{}:{}", t.label, t.login(), t.port);
        }
        return Ok(());
    };

    let target = pick(nav, index)?;
    tracing::debug!(host = %target.host, port = %target.port, "ssh");
    let status = Command::new("ssh")
        .arg("-p")
        .arg(&target.port)
        .arg(target.login())
        .status()
        .context("Failed to run ssh")?;
    if !status.success() {
        bail!("ssh exited with {status}");
    }
    Ok(())
}

/// Execute the transfer command: scp `local` to target `index`
pub fn transfer_command(
    nav: &Navigator,
    index: usize,
    local: &Path,
    remote: Option<&str>,
) -> Result<()> {
    if !local.exists() {
        bail!("No such file {}", local.display());
    }
    let target = pick(nav, index)?;
    let dest = format!("{}:{}", target.login(), remote.unwrap_or(""));

    let status = Command::new("scp")
        .arg("-P")
        .arg(&target.port)
        .arg(local)
        .arg(&dest)
        .status()
        .context("Failed to run scp")?;
    if !status.success() {
        bail!("scp exited with {status}");
    }
    print_info(&format!("Copied {} to {dest}", local.display()));
    Ok(())
}

/// Contents of every `*.pub` file in `dir`, sorted by file name
pub fn pubkeys(dir: &Path) -> Result<String> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "pub"))
        .collect();
    paths.sort();

    let mut keys = String::new();
    for path in paths {
        let key = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        keys.push_str(key.trim_end());
        keys.push('\n');
    }
    Ok(keys)
}

/// Execute `show keys`
pub fn show_keys() -> Result<()> {
    let dir = dirs::home_dir()
        .context("Could not determine home directory")?
        .join(".ssh");
    print!("{}", pubkeys(&dir)?);
    Ok(())
}
