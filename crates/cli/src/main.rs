//! File Exchange CLI
//!
//! Upload, list and download files against the remote store.

mod commands;
mod output;
mod shell;

use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use exchange_client::config::{LoggingConfig, DEFAULT_TOKEN_ENV, MAIN_URL_ENV, UNPACK_URL_ENV};
use exchange_client::credentials::KeychainBackend;
use exchange_client::{
    default_config_path, BearerToken, Config, CredentialProvider, CredentialSource,
    ExchangeClient, KeyringCredentialProvider, RemoteGateway,
};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::output::{notify, OutputPath, PromptPath};

/// File Exchange - move files to and from a remote store.
#[derive(Parser, Debug)]
#[command(name = "file-exchange")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Upload a local file, then show the refreshed listing
    Submit {
        /// File to upload
        path: PathBuf,
    },

    /// Show the files held by the remote store
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Download a remote file
    Download {
        /// Remote file name, as shown by `list`
        name: String,

        /// Destination file or directory (prompted for when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Start an interactive session
    Shell,

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Print the configuration file path
    Path,

    /// Read a bearer token from stdin and save it in the system keychain
    SetToken,
}

/// Reported when the startup check fails.
const NOT_CONFIGURED: &str = "Application URLs or Token not fully configured";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;

    // Apply environment variable overrides
    config.apply_env_overrides();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    // Validate configuration
    config.validate()?;

    let _log_guard = init_tracing(&config.logging)?;
    info!("Using config file: {:?}", config_path);

    let succeeded = match cli.command {
        Commands::Config(cmd) => run_config_command(&cmd, &config, &config_path)?,
        Commands::Submit { path } => {
            let client = connect(&config)?;
            commands::choose(&client, Some(path)) && commands::submit(&client).await
        }
        Commands::List { json } => {
            let client = connect(&config)?;
            commands::list(&client, json).await
        }
        Commands::Download { name, output } => {
            let client = connect(&config)?;
            match output {
                Some(path) => commands::download(&client, &name, &OutputPath(path)).await,
                None => commands::download(&client, &name, &PromptPath).await,
            }
        }
        Commands::Shell => {
            let client = connect(&config)?;
            shell::run(&client).await?;
            true
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Build the client and run the startup check.
fn connect(config: &Config) -> anyhow::Result<ExchangeClient> {
    info!("Starting application...");
    let client = ExchangeClient::from_config(config)?;
    startup_check(&client)?;
    Ok(client)
}

/// Install the stderr subscriber, plus a file writer when configured.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&logging.level)
        .with_context(|| format!("Invalid log filter: {}", logging.level))?;

    let (file_layer, guard) = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

/// What the startup check found.
#[derive(Debug)]
struct StartupStatus {
    unpack_set: bool,
    main_set: bool,
    token_set: bool,
    /// One message per missing item.
    problems: Vec<String>,
}

fn inspect_startup<G: RemoteGateway>(client: &ExchangeClient<G>) -> StartupStatus {
    let missing = client.endpoints().missing();
    let mut problems: Vec<String> = missing
        .iter()
        .map(|name| format!("{} environment variable is not set.", name))
        .collect();

    let token_set = match client.credentials().resolve() {
        Ok(_) => true,
        Err(e) => {
            error!("{}", e);
            problems.push(format!(
                "Authorization token not found ({}).",
                client.credentials().describe()
            ));
            false
        }
    };

    StartupStatus {
        unpack_set: !missing.contains(&UNPACK_URL_ENV),
        main_set: !missing.contains(&MAIN_URL_ENV),
        token_set,
        problems,
    }
}

/// Check that both endpoints and the token are available.
///
/// Every missing item is logged and notified before failing.
fn startup_check<G: RemoteGateway>(client: &ExchangeClient<G>) -> anyhow::Result<()> {
    let status = inspect_startup(client);
    for problem in &status.problems {
        error!("{}", problem);
        notify("Configuration Error", problem);
    }

    info!("{} set: {}", UNPACK_URL_ENV, status.unpack_set);
    info!("{} set: {}", MAIN_URL_ENV, status.main_set);
    info!("Token set: {}", status.token_set);

    if !status.problems.is_empty() {
        anyhow::bail!(NOT_CONFIGURED);
    }
    Ok(())
}

/// Read one token line from `input` and save it through `provider`.
fn store_token<B: KeychainBackend>(
    provider: &KeyringCredentialProvider<B>,
    input: &mut impl BufRead,
) -> anyhow::Result<bool> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let Some(token) = BearerToken::new(line.trim()) else {
        eprintln!("No token given; nothing stored.");
        return Ok(false);
    };

    provider
        .store(&token)
        .with_context(|| format!("Failed to store token in {}", provider.describe()))?;
    println!("Token stored in {}", provider.describe());
    Ok(true)
}

fn run_config_command(
    cmd: &ConfigCommands,
    config: &Config,
    config_path: &Path,
) -> anyhow::Result<bool> {
    match cmd {
        ConfigCommands::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                eprintln!(
                    "Config file already exists at {} (use --force to overwrite)",
                    config_path.display()
                );
                return Ok(false);
            }
            Config::default().save(config_path)?;
            println!("Wrote default configuration to {}", config_path.display());
            println!(
                "Set {} and {} (or edit the file), and put the token in {}.",
                UNPACK_URL_ENV, MAIN_URL_ENV, DEFAULT_TOKEN_ENV
            );
        }
        ConfigCommands::Path => {
            println!("{}", config_path.display());
        }
        ConfigCommands::SetToken => {
            let provider = KeyringCredentialProvider::system(
                &config.auth.keyring_service,
                &config.auth.keyring_user,
            );
            eprint!("Token: ");
            io::stderr().flush()?;
            if !store_token(&provider, &mut io::stdin().lock())? {
                return Ok(false);
            }
            if config.auth.source != CredentialSource::Keyring {
                println!("Set `source = \"keyring\"` under [auth] to use it.");
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use exchange_client::credentials::CredentialResult;
    use exchange_client::{
        CredentialError, EndpointConfig, HttpGateway, StaticCredentialProvider, Timeouts,
    };
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_submit_command() {
        let cli = Cli::try_parse_from(["file-exchange", "submit", "report.pdf"]).unwrap();
        match cli.command {
            Commands::Submit { path } => assert_eq!(path, PathBuf::from("report.pdf")),
            _ => panic!("Expected Submit command"),
        }
    }

    #[test]
    fn test_submit_requires_path() {
        assert!(Cli::try_parse_from(["file-exchange", "submit"]).is_err());
    }

    #[test]
    fn test_list_json() {
        let cli = Cli::try_parse_from(["file-exchange", "list", "--json"]).unwrap();
        match cli.command {
            Commands::List { json } => assert!(json),
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_download_with_output() {
        let cli = Cli::try_parse_from([
            "file-exchange",
            "download",
            "doc.pdf",
            "--output",
            "/tmp/doc.pdf",
        ])
        .unwrap();
        match cli.command {
            Commands::Download { name, output } => {
                assert_eq!(name, "doc.pdf");
                assert_eq!(output, Some(PathBuf::from("/tmp/doc.pdf")));
            }
            _ => panic!("Expected Download command"),
        }
    }

    #[test]
    fn test_download_without_output_prompts() {
        let cli = Cli::try_parse_from(["file-exchange", "download", "doc.pdf"]).unwrap();
        match cli.command {
            Commands::Download { output, .. } => assert!(output.is_none()),
            _ => panic!("Expected Download command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["file-exchange", "list", "-v", "--config", "/tmp/c.toml"])
                .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::try_parse_from(["file-exchange", "config", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Init { force }) => assert!(force),
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# existing").unwrap();

        let written = run_config_command(
            &ConfigCommands::Init { force: false },
            &Config::default(),
            &path,
        )
        .unwrap();
        assert!(!written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# existing");
    }

    #[test]
    fn test_config_init_writes_loadable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let written = run_config_command(
            &ConfigCommands::Init { force: false },
            &Config::default(),
            &path,
        )
        .unwrap();
        assert!(written);
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_config_set_token_command() {
        let cli = Cli::try_parse_from(["file-exchange", "config", "set-token"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::SetToken)
        ));
    }

    // =========================================================================
    // Startup Check Tests
    // =========================================================================

    fn startup_client(
        unpack: Option<&str>,
        main: Option<&str>,
        credentials: StaticCredentialProvider,
    ) -> ExchangeClient {
        let mut config = Config::default();
        config.endpoints.unpack_url = unpack.map(str::to_string);
        config.endpoints.main_url = main.map(str::to_string);
        let endpoints = EndpointConfig::from_config(&config).unwrap();
        let gateway = HttpGateway::new(Timeouts::default()).unwrap();
        ExchangeClient::new(gateway, endpoints, Arc::new(credentials))
    }

    #[test]
    fn test_startup_check_reports_everything_missing() {
        let client = startup_client(None, None, StaticCredentialProvider::missing());

        let status = inspect_startup(&client);
        assert!(!status.unpack_set);
        assert!(!status.main_set);
        assert!(!status.token_set);
        assert_eq!(status.problems.len(), 3);
        assert!(status.problems[0].contains(UNPACK_URL_ENV));
        assert!(status.problems[1].contains(MAIN_URL_ENV));
        assert!(status.problems[2].starts_with("Authorization token not found"));

        let err = startup_check(&client).unwrap_err();
        assert_eq!(err.to_string(), NOT_CONFIGURED);
    }

    #[test]
    fn test_startup_check_token_only_missing() {
        let client = startup_client(
            Some("https://store.example.com/unpack"),
            Some("https://store.example.com/main"),
            StaticCredentialProvider::missing(),
        );

        let status = inspect_startup(&client);
        assert!(status.unpack_set);
        assert!(status.main_set);
        assert!(!status.token_set);
        assert_eq!(status.problems.len(), 1);
        assert!(startup_check(&client).is_err());
    }

    #[test]
    fn test_startup_check_one_url_missing() {
        let client = startup_client(
            Some("https://store.example.com/unpack"),
            None,
            StaticCredentialProvider::new("t"),
        );

        let status = inspect_startup(&client);
        assert!(status.unpack_set);
        assert!(!status.main_set);
        assert!(status.token_set);
        assert_eq!(status.problems.len(), 1);
        assert!(status.problems[0].contains(MAIN_URL_ENV));
        assert!(startup_check(&client).is_err());
    }

    #[test]
    fn test_startup_check_all_present() {
        let client = startup_client(
            Some("https://store.example.com/unpack"),
            Some("https://store.example.com/main"),
            StaticCredentialProvider::new("t"),
        );

        let status = inspect_startup(&client);
        assert!(status.unpack_set && status.main_set && status.token_set);
        assert!(status.problems.is_empty());
        assert!(startup_check(&client).is_ok());
    }

    // =========================================================================
    // Token Storage Tests
    // =========================================================================

    #[derive(Default)]
    struct MemoryKeychain {
        secrets: Mutex<HashMap<(String, String), String>>,
    }

    impl KeychainBackend for MemoryKeychain {
        fn get_secret(&self, service: &str, key: &str) -> CredentialResult<String> {
            self.secrets
                .lock()
                .unwrap()
                .get(&(service.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| CredentialError::Missing(format!("{}/{}", service, key)))
        }

        fn set_secret(&self, service: &str, key: &str, value: &str) -> CredentialResult<()> {
            self.secrets
                .lock()
                .unwrap()
                .insert((service.to_string(), key.to_string()), value.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_store_token_from_input() {
        let provider =
            KeyringCredentialProvider::with_backend(MemoryKeychain::default(), "svc", "user");
        let mut input = Cursor::new("  secret-token \n");

        assert!(store_token(&provider, &mut input).unwrap());
        assert_eq!(provider.resolve().unwrap().as_str(), "secret-token");
    }

    #[test]
    fn test_store_token_blank_input_stores_nothing() {
        let provider =
            KeyringCredentialProvider::with_backend(MemoryKeychain::default(), "svc", "user");
        let mut input = Cursor::new("\n");

        assert!(!store_token(&provider, &mut input).unwrap());
        assert!(provider.resolve().is_err());
    }
}
