//! Interactive shell for dtncli

use std::io::Write;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use crossterm::style::Stylize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{error::ReadlineError, history::FileHistory, Editor};
use rustyline_derive::Helper;

use janus_client::Client;

use crate::commands::{self, ShellCommand, ShellLine, ShowItem};
use crate::nav::Navigator;
use crate::output::{print_error, print_info};

const COMMANDS: &[&str] = &[
    "cd", "exit", "help", "images", "logs", "ls", "lsd", "nodes", "profiles", "pwd", "quit", "rm",
    "show", "ssh", "start", "stop", "sync", "transfer", "url",
];

/// Commands whose first argument is a key of the current view
const KEY_COMMANDS: &[&str] = &["cd", "ls", "lsd", "rm"];

/// Yes/no questions asked before destructive commands
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Asks on stdin; anything but `y`/`yes` means no
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        print!("{question} (y/N) ");
        let _ = std::io::stdout().flush();
        let mut input = String::new();
        match std::io::stdin().read_line(&mut input) {
            Ok(_) => parse_yes_no(&input),
            Err(_) => false,
        }
    }
}

pub fn parse_yes_no(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Whether the loop should keep reading lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Completion candidates for `line`, with the offset they replace from
pub fn complete_line(line: &str, keys: &[String]) -> (usize, Vec<String>) {
    let start = line
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let word = &line[start..];
    let first = line.split_whitespace().next().unwrap_or("");

    let candidates: Vec<String> = if start == 0 {
        COMMANDS.iter().map(|c| c.to_string()).collect()
    } else {
        match first {
            "sync" => vec!["nodes".into(), "active".into(), "refresh".into()],
            "show" => vec!["keys".into()],
            cmd if KEY_COMMANDS.contains(&cmd) => keys.to_vec(),
            _ => Vec::new(),
        }
    };

    let matches = candidates
        .into_iter()
        .filter(|c| c.starts_with(word))
        .collect();
    (start, matches)
}

#[derive(Helper)]
struct ShellHelper {
    keys: Vec<String>,
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, matches) = complete_line(&line[..pos], &self.keys);
        let pairs = matches
            .into_iter()
            .map(|m| Pair {
                display: m.clone(),
                replacement: m,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Highlighter for ShellHelper {}
impl Hinter for ShellHelper {
    type Hint = String;
}
impl Validator for ShellHelper {}

/// The shell's state: controller client plus the navigated config
pub struct Shell {
    client: Client,
    nav: Navigator,
}

impl Shell {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            nav: Navigator::new(),
        }
    }

    pub fn nav(&self) -> &Navigator {
        &self.nav
    }

    /// Parse and run one line
    pub async fn execute(&mut self, line: &str, confirm: &mut dyn Confirm) -> Result<Flow> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            return Ok(Flow::Continue);
        }

        let command = match ShellLine::try_parse_from(words.iter().copied()) {
            Ok(parsed) => parsed.command,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) =>
            {
                print!("{}", e.render());
                return Ok(Flow::Continue);
            }
            Err(e) => anyhow::bail!("{}", e.render().to_string().trim_end()),
        };

        self.dispatch(command, confirm).await
    }

    async fn dispatch(&mut self, command: ShellCommand, confirm: &mut dyn Confirm) -> Result<Flow> {
        let client = &self.client;
        let nav = &mut self.nav;

        match command {
            ShellCommand::Sync { args } => commands::sync_command(client, nav, &args).await?,
            ShellCommand::Ssh { index } => commands::ssh_command(nav, index)?,
            ShellCommand::Show { item: ShowItem::Keys } => commands::show_keys()?,
            ShellCommand::Transfer {
                index,
                local,
                remote,
            } => commands::transfer_command(nav, index, &local, remote.as_deref())?,
            ShellCommand::Rm { key } => {
                commands::rm_command(client, nav, key.as_deref(), confirm).await?
            }
            ShellCommand::Cd { path } => commands::cd_command(nav, path.as_deref())?,
            ShellCommand::Ls { key } => commands::ls_command(nav, key.as_deref())?,
            ShellCommand::Lsd { key } => commands::lsd_command(nav, key.as_deref())?,
            ShellCommand::Pwd => commands::pwd_command(nav),
            ShellCommand::Nodes { name, refresh } => {
                commands::nodes_command(client, name.as_deref(), refresh).await?
            }
            ShellCommand::Profiles {
                resource,
                name,
                refresh,
            } => commands::profiles_command(client, resource, name.as_deref(), refresh).await?,
            ShellCommand::Images { name } => commands::images_command(client, name.as_deref()).await?,
            ShellCommand::Logs { id, node, tail } => {
                commands::logs_command(client, &id, &node, tail).await?
            }
            ShellCommand::Start { id } => commands::start_command(client, &id).await?,
            ShellCommand::Stop { id } => commands::stop_command(client, &id).await?,
            ShellCommand::Url { url } => commands::url_command(&mut self.client, url),
            ShellCommand::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    /// Run `lines` in order without prompting; failures are reported and skipped
    pub async fn run_batch(&mut self, lines: &[String], confirm: &mut dyn Confirm) {
        for line in lines {
            match self.execute(line, confirm).await {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => print_error(&e.to_string()),
            }
        }
    }

    /// Read-eval loop on the terminal until `exit` or a confirmed EOF
    pub async fn run_interactive(&mut self) -> Result<()> {
        let history_path = dirs::cache_dir()
            .map(|p| p.join("dtncli").join("history.txt"))
            .unwrap_or_else(|| ".dtncli_history".into());
        if let Some(parent) = history_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let mut rl: Editor<ShellHelper, FileHistory> = Editor::new()?;
        rl.set_helper(Some(ShellHelper { keys: self.nav.completions("") }));
        if rl.load_history(&history_path).is_err() {
            tracing::debug!("no shell history at {:?}", history_path);
        }

        let prompt = format!("{} ", "dtncli>".green().bold());
        let mut confirm = StdinConfirm;

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line)?;

                    match self.execute(line, &mut confirm).await {
                        Ok(Flow::Exit) => break,
                        Ok(Flow::Continue) => {}
                        Err(e) => print_error(&e.to_string()),
                    }
                    if let Some(helper) = rl.helper_mut() {
                        helper.keys = self.nav.completions("");
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    print_info("Use 'exit' to quit");
                }
                Err(ReadlineError::Eof) => {
                    let quit = match rl.readline("\nReally quit? (y/N) ") {
                        Ok(answer) => parse_yes_no(&answer),
                        Err(_) => true,
                    };
                    if quit {
                        break;
                    }
                }
                Err(err) => {
                    print_error(&format!("Error: {}", err));
                    break;
                }
            }
        }

        rl.save_history(&history_path).ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use janus_core::config::ClientConfig;

    struct Answer(bool, Vec<String>);

    impl Confirm for Answer {
        fn confirm(&mut self, question: &str) -> bool {
            self.1.push(question.to_string());
            self.0
        }
    }

    fn offline_shell() -> Shell {
        let config = ClientConfig {
            url: "http://127.0.0.1:9".into(),
            ..ClientConfig::default()
        };
        Shell::new(Client::new(&config).unwrap())
    }

    #[test]
    fn test_parse_yes_no() {
        assert!(parse_yes_no("y\n"));
        assert!(parse_yes_no(" YES "));
        assert!(!parse_yes_no(""));
        assert!(!parse_yes_no("n"));
        assert!(!parse_yes_no("yep"));
    }

    #[test]
    fn test_complete_commands() {
        let (start, matches) = complete_line("ls", &[]);
        assert_eq!(start, 0);
        assert_eq!(matches, vec!["ls", "lsd"]);

        let (_, matches) = complete_line("s", &[]);
        assert_eq!(matches, vec!["show", "ssh", "start", "stop", "sync"]);
    }

    #[test]
    fn test_complete_arguments() {
        let keys = vec!["active".to_string(), "nodes".to_string()];

        let (start, matches) = complete_line("cd no", &keys);
        assert_eq!(start, 3);
        assert_eq!(matches, vec!["nodes"]);

        let (_, matches) = complete_line("sync a", &keys);
        assert_eq!(matches, vec!["active"]);

        let (_, matches) = complete_line("pwd ", &keys);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_complete_after_wide_space() {
        let keys = vec!["nodes".to_string()];

        let (start, matches) = complete_line("cd\u{3000}no", &keys);
        assert_eq!(start, "cd\u{3000}".len());
        assert_eq!(matches, vec!["nodes"]);
    }

    #[tokio::test]
    async fn test_navigation_errors_leave_state() {
        let mut shell = offline_shell();
        let mut confirm = Answer(true, Vec::new());

        shell.execute("cd /nodes", &mut confirm).await.unwrap();
        let err = shell.execute("cd missing", &mut confirm).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "No such path through config at pos: 2 missing in /nodes"
        );
        assert_eq!(shell.nav().pwd(), "/nodes");
    }

    #[tokio::test]
    async fn test_rm_outside_active_does_not_prompt() {
        let mut shell = offline_shell();
        let mut confirm = Answer(true, Vec::new());

        shell.execute("rm 12", &mut confirm).await.unwrap();

        assert!(confirm.1.is_empty());
    }

    #[tokio::test]
    async fn test_exit_and_unknown_commands() {
        let mut shell = offline_shell();
        let mut confirm = Answer(false, Vec::new());

        assert_eq!(shell.execute("   ", &mut confirm).await.unwrap(), Flow::Continue);
        assert_eq!(shell.execute("help", &mut confirm).await.unwrap(), Flow::Continue);
        assert_eq!(shell.execute("exit", &mut confirm).await.unwrap(), Flow::Exit);
        assert!(shell.execute("frobnicate", &mut confirm).await.is_err());
    }
}
