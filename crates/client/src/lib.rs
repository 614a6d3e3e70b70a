//! # File Exchange Client Library
//!
//! Client core for exchanging files with a remote object store: upload a
//! locally selected file, list what the store holds, and download a listed
//! file to a path of the caller's choosing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ExchangeClient                         │
//! │                                                              │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐  │
//! │  │ SelectionState │  │RemoteFileCache │  │ EndpointConfig │  │
//! │  └────────────────┘  └────────────────┘  └────────────────┘  │
//! │                                                              │
//! │  ┌────────────────────────┐  ┌────────────────────────────┐  │
//! │  │  CredentialProvider    │  │  RemoteGateway (reqwest)   │  │
//! │  │  env / keyring         │  │  submit · list · download  │  │
//! │  └────────────────────────┘  └────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exchange_client::{Config, ExchangeClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!     config.validate()?;
//!
//!     let client = ExchangeClient::from_config(&config)?;
//!     client.choose(Some("report.pdf".into()));
//!
//!     let report = client.submit().await?;
//!     println!("{}", report.response);
//!     for entry in client.cached_files() {
//!         println!("{} ({} bytes)", entry.name, entry.size);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`orchestrator`]: The client and its operations
//! - [`gateway`]: HTTP transport for the three remote calls
//! - [`credentials`]: Bearer token providers
//! - [`config`]: Configuration loading and endpoint resolution
//! - [`selection`]: The local file chosen for upload
//! - [`cache`]: The last fetched remote listing
//! - [`error`]: Error types

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod selection;

pub use cache::{sort_entries, RemoteFileCache};
pub use config::{default_config_path, Config, ConfigError, CredentialSource, EndpointConfig};
pub use credentials::{
    provider_from_config, BearerToken, CredentialError, CredentialProvider,
    EnvCredentialProvider, KeyringCredentialProvider, StaticCredentialProvider,
};
pub use error::{ExchangeError, ExchangeResult};
pub use gateway::{HttpGateway, RemoteGateway, Timeouts};
pub use orchestrator::{
    Completion, DownloadOutcome, ExchangeClient, ExchangeEvent, ListReport, OperationKind,
    OperationState, PathProvider, SubmitReport,
};
pub use selection::{LocalSelection, SelectionState};

pub use protocol::RemoteFileEntry;
