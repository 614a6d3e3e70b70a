//! Interactive session.
//!
//! Keeps one client alive so the selection and the cached listing carry over
//! between commands.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use exchange_client::{ExchangeClient, RemoteGateway};

use crate::commands;
use crate::output::{print_listing, PromptPath};

const HELP: &str = "\
Commands:
  choose [PATH]     select a local file (no path clears the selection)
  clear             clear the selection
  submit            upload the selected file and refresh the listing
  list              refresh and show the remote listing
  files             show the cached listing
  download NAME     download a remote file
  status            show selection, cache and configuration
  help              show this help
  quit              leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Choose(Option<PathBuf>),
    Clear,
    Submit,
    List,
    Files,
    Download(String),
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "choose" => Self::Choose((!rest.is_empty()).then(|| PathBuf::from(rest))),
            "clear" => Self::Clear,
            "submit" => Self::Submit,
            "list" => Self::List,
            "files" => Self::Files,
            "download" if rest.is_empty() => {
                return Err("usage: download NAME".to_string());
            }
            "download" => Self::Download(rest.to_string()),
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(Some(command))
    }
}

pub async fn run<G: RemoteGateway>(client: &ExchangeClient<G>) -> anyhow::Result<()> {
    eprintln!("{}", HELP);
    let stdin = io::stdin();

    loop {
        eprint!("file-exchange> ");
        io::stderr().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{}", msg);
                continue;
            }
        };

        match command {
            ShellCommand::Choose(path) => {
                commands::choose(client, path);
            }
            ShellCommand::Clear => {
                client.clear_selection();
                println!("No file selected");
            }
            ShellCommand::Submit => {
                commands::submit(client).await;
            }
            ShellCommand::List => {
                commands::list(client, false).await;
            }
            ShellCommand::Files => print_listing(&client.cached_files()),
            ShellCommand::Download(name) => {
                commands::download(client, &name, &PromptPath).await;
            }
            ShellCommand::Status => commands::status(client),
            ShellCommand::Help => eprintln!("{}", HELP),
            ShellCommand::Quit => break,
        }
    }

    tracing::info!("Shell closed");
    Ok(())
}
