//! Shell command implementations

mod browse;
mod controller;
mod remote;
mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use janus_client::{ResourceType, Response};

pub use browse::{cd_command, ls_command, lsd_command, pwd_command};
pub use controller::{
    images_command, logs_command, nodes_command, profiles_command, start_command, stop_command,
    url_command,
};
pub use remote::{pubkeys, show_keys, ssh_command, ssh_targets, transfer_command, SshTarget};
pub use sync::{rm_command, sync_command};

/// One line typed at the `dtncli>` prompt
#[derive(Debug, Parser)]
#[command(
    name = "dtncli",
    no_binary_name = true,
    disable_version_flag = true
)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShellCommand {
    /// Refresh the cached config: sync [nodes|active [id]] [refresh]
    Sync {
        /// Section to refresh, "refresh" to re-probe nodes
        args: Vec<String>,
    },

    /// List SSH targets below the current path, or connect to target <n>
    Ssh {
        index: Option<usize>,
    },

    /// Show local items
    Show {
        #[arg(value_enum)]
        item: ShowItem,
    },

    /// Copy a local file to SSH target <n> with scp
    Transfer {
        index: usize,
        local: PathBuf,
        remote: Option<String>,
    },

    /// Delete an active session (only inside /active)
    Rm {
        key: Option<String>,
    },

    /// Change the current path in the config
    Cd {
        path: Option<String>,
    },

    /// Show the current level of the config, or the value under <key>
    Ls {
        key: Option<String>,
    },

    /// Show everything below the current level, or the entry named <key>
    Lsd {
        key: Option<String>,
    },

    /// Print the current path
    Pwd,

    /// Show controller nodes as a table, or one node in full
    Nodes {
        name: Option<String>,
        /// Ask the controller to re-probe its nodes
        #[arg(long)]
        refresh: bool,
    },

    /// Show profiles, optionally for one resource type and name
    Profiles {
        resource: Option<ResourceType>,
        name: Option<String>,
        #[arg(long)]
        refresh: bool,
    },

    /// Show container images known to the controller
    Images {
        name: Option<String>,
    },

    /// Show container logs of a session on one node
    Logs {
        id: String,
        node: String,
        /// Only the last <n> lines
        #[arg(long)]
        tail: Option<u32>,
    },

    /// Start a session
    Start {
        id: String,
    },

    /// Stop a session
    Stop {
        id: String,
    },

    /// Print the controller URL, or replace it
    Url {
        url: Option<String>,
    },

    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowItem {
    Keys,
}

/// Turn an error status into a command failure
pub(crate) fn check(resp: &Response, what: &str) -> anyhow::Result<()> {
    if resp.error() {
        anyhow::bail!("{what} failed: {resp}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<ShellCommand, clap::Error> {
        ShellLine::try_parse_from(line.split_whitespace()).map(|l| l.command)
    }

    #[test]
    fn test_parse_navigation() {
        assert!(matches!(parse("cd").unwrap(), ShellCommand::Cd { path: None }));
        assert!(matches!(
            parse("cd ../nodes").unwrap(),
            ShellCommand::Cd { path: Some(p) } if p == "../nodes"
        ));
        assert!(matches!(parse("pwd").unwrap(), ShellCommand::Pwd));
        assert!(matches!(parse("quit").unwrap(), ShellCommand::Exit));
    }

    #[test]
    fn test_parse_sync_args() {
        match parse("sync nodes refresh").unwrap() {
            ShellCommand::Sync { args } => assert_eq!(args, vec!["nodes", "refresh"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_typed_arguments() {
        assert!(matches!(
            parse("profiles volume scratch").unwrap(),
            ShellCommand::Profiles { resource: Some(ResourceType::Volume), name: Some(_), refresh: false }
        ));
        assert!(matches!(
            parse("show keys").unwrap(),
            ShellCommand::Show { item: ShowItem::Keys }
        ));
        assert!(parse("profiles disk").is_err());
        assert!(parse("transfer x file").is_err());
        assert!(parse("frobnicate").is_err());
    }

    #[test]
    fn test_check_status() {
        assert!(check(&Response::new(400, "bad"), "start").is_ok());
        let err = check(&Response::new(404, "gone"), "start").unwrap_err();
        assert_eq!(err.to_string(), "start failed: 404 gone");
    }
}
