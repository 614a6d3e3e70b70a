//! Exchange orchestrator.
//!
//! [`ExchangeClient`] owns the selection, the remote file cache, the endpoint
//! configuration and the credential provider, and composes them with a
//! [`RemoteGateway`] into the three user-facing operations:
//!
//! - [`ExchangeClient::submit`]: upload the selected file, then refresh the listing
//! - [`ExchangeClient::list`]: fetch the listing and replace the cache
//! - [`ExchangeClient::download`]: fetch a listed file and save it where the
//!   [`PathProvider`] says
//!
//! Only one operation runs at a time. Each moves `Idle -> InFlight` and back
//! to `Idle` when it ends, whether it succeeded, failed or was cancelled; a
//! call made while another is in flight fails with [`ExchangeError::Busy`].

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::Context;
use protocol::{codec, RemoteFileEntry, SubmitRequest};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::cache::{sort_entries, RemoteFileCache};
use crate::config::{Config, EndpointConfig};
use crate::credentials::{provider_from_config, BearerToken, CredentialProvider};
use crate::error::{ExchangeError, ExchangeResult};
use crate::gateway::{HttpGateway, RemoteGateway, Timeouts};
use crate::selection::{LocalSelection, SelectionState};

/// Capacity of the event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The three exchange operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Submit,
    List,
    Download,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Submit => "submit",
            OperationKind::List => "list",
            OperationKind::Download => "download",
        })
    }
}

/// Whether an operation is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    InFlight(OperationKind),
}

/// How a finished operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    Failed,
    Cancelled,
}

/// Events emitted by the client for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeEvent {
    /// An operation moved to in-flight.
    Started(OperationKind),
    /// An operation returned to idle.
    Finished {
        kind: OperationKind,
        completion: Completion,
    },
    /// The remote file cache was replaced.
    CacheReplaced { count: usize },
    /// The selection changed; carries the new display name.
    SelectionChanged(Option<String>),
}

/// Chooses where a downloaded file is saved.
pub trait PathProvider {
    /// Return a destination for `suggested_name`, or `None` to cancel.
    fn save_path(&self, suggested_name: &str) -> Option<PathBuf>;
}

/// Result of a successful listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListReport {
    /// Status line from the server.
    pub message: String,
    /// File count as reported by the server.
    pub reported_count: u64,
    /// The new cache contents.
    pub entries: Vec<RemoteFileEntry>,
}

/// Result of a successful upload.
#[derive(Debug)]
pub struct SubmitReport {
    /// Remote name the file was stored under.
    pub filename: String,
    /// Server response text.
    pub response: String,
    /// Outcome of the listing refresh that follows every upload.
    pub refresh: ExchangeResult<ListReport>,
}

/// Result of a download that reached the save step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Content written to `path`.
    Saved {
        filename: String,
        path: PathBuf,
        bytes: usize,
    },
    /// The path provider declined to pick a destination.
    Cancelled { filename: String },
}

/// Marks the client in-flight; resets it to idle when dropped.
struct InFlight<'a> {
    state: &'a Mutex<OperationState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = OperationState::Idle;
    }
}

/// The remote file exchange client.
pub struct ExchangeClient<G: RemoteGateway = HttpGateway> {
    gateway: G,
    endpoints: EndpointConfig,
    credentials: Arc<dyn CredentialProvider>,
    selection: RwLock<SelectionState>,
    cache: RwLock<RemoteFileCache>,
    state: Mutex<OperationState>,
    event_tx: broadcast::Sender<ExchangeEvent>,
}

impl ExchangeClient<HttpGateway> {
    /// Build an HTTP client from a loaded configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let endpoints =
            EndpointConfig::from_config(config).context("Invalid endpoint configuration")?;
        let gateway = HttpGateway::new(Timeouts::from(&config.http))?;
        Ok(Self::new(gateway, endpoints, provider_from_config(&config.auth)))
    }
}

impl<G: RemoteGateway> ExchangeClient<G> {
    pub fn new(
        gateway: G,
        endpoints: EndpointConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            gateway,
            endpoints,
            credentials,
            selection: RwLock::new(SelectionState::new()),
            cache: RwLock::new(RemoteFileCache::new()),
            state: Mutex::new(OperationState::Idle),
            event_tx,
        }
    }

    /// Subscribe to client events.
    pub fn subscribe(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> OperationState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn endpoints(&self) -> &EndpointConfig {
        &self.endpoints
    }

    pub fn credentials(&self) -> &dyn CredentialProvider {
        self.credentials.as_ref()
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Apply a file picker result. `None` (cancelled) or an unusable path
    /// clears the selection.
    pub fn choose(&self, picked: Option<PathBuf>) -> Option<LocalSelection> {
        let chosen = self
            .selection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .choose(picked)
            .cloned();

        match &chosen {
            Some(selection) => info!("Selected file: {}", selection.path().display()),
            None => info!("No file selected"),
        }
        self.emit(ExchangeEvent::SelectionChanged(
            chosen.as_ref().map(|s| s.display_name().to_string()),
        ));
        chosen
    }

    pub fn clear_selection(&self) {
        self.selection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.emit(ExchangeEvent::SelectionChanged(None));
    }

    pub fn selection(&self) -> Option<LocalSelection> {
        self.selection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current()
            .cloned()
    }

    /// The cached listing, in display order.
    pub fn cached_files(&self) -> Vec<RemoteFileEntry> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Number of entries in the cached listing.
    pub fn cached_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Upload the selected file, then refresh the listing.
    ///
    /// A failed upload leaves both the cache and the selection untouched. The
    /// refresh runs only after a successful upload, and its own outcome is
    /// reported in [`SubmitReport::refresh`].
    pub async fn submit(&self) -> ExchangeResult<SubmitReport> {
        let in_flight = self.begin(OperationKind::Submit)?;
        let result = self.submit_inner().await;
        drop(in_flight);
        self.finish(OperationKind::Submit, &result, false);
        result
    }

    async fn submit_inner(&self) -> ExchangeResult<SubmitReport> {
        let selection = self.selection().ok_or(ExchangeError::NoSelection)?;
        let endpoint = self.endpoints.unpack_url()?.clone();
        self.endpoints.main_url()?;

        let filename = selection.display_name().to_string();
        info!("Preparing to submit file: {}...", filename);

        let content = tokio::fs::read(selection.path())
            .await
            .map_err(|e| ExchangeError::local_io(selection.path(), e))?;
        let request = SubmitRequest {
            input: codec::encode_for_upload(&content),
            filename: filename.clone(),
        };

        let token = self.resolve_token()?;
        let response = self.gateway.submit(&endpoint, &token, &request).await?;
        info!(filename = %filename, "File submitted successfully!");
        info!("Response: {}", response);

        let refresh = self.list_inner().await;
        if let Err(e) = &refresh {
            warn!("Listing refresh after submit failed: {}", e);
        }

        Ok(SubmitReport {
            filename,
            response,
            refresh,
        })
    }

    /// Fetch the listing and replace the cache with it.
    ///
    /// On failure the previous cache is kept as it was.
    pub async fn list(&self) -> ExchangeResult<ListReport> {
        let in_flight = self.begin(OperationKind::List)?;
        let result = self.list_inner().await;
        drop(in_flight);
        self.finish(OperationKind::List, &result, false);
        result
    }

    async fn list_inner(&self) -> ExchangeResult<ListReport> {
        let endpoint = self.endpoints.unpack_url()?.clone();
        info!("Retrieving list of files...");

        let token = self.resolve_token()?;
        let response = self.gateway.list(&endpoint, &token).await?;
        info!("{}", response.message);

        let message = response.message.clone();
        let reported_count = response.count;
        let entries = sort_entries(response.into_entries());

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace_with(entries.clone());
        self.emit(ExchangeEvent::CacheReplaced {
            count: entries.len(),
        });
        info!(count = reported_count, "Retrieved {} files.", reported_count);

        Ok(ListReport {
            message,
            reported_count,
            entries,
        })
    }

    /// Download `filename` and save it where `paths` chooses.
    ///
    /// The name should come from the last listing; only emptiness is checked
    /// here. Neither the cache nor the selection is modified.
    pub async fn download(
        &self,
        filename: &str,
        paths: &dyn PathProvider,
    ) -> ExchangeResult<DownloadOutcome> {
        let in_flight = self.begin(OperationKind::Download)?;
        let result = self.download_inner(filename, paths).await;
        drop(in_flight);
        let cancelled = matches!(result, Ok(DownloadOutcome::Cancelled { .. }));
        self.finish(OperationKind::Download, &result, cancelled);
        result
    }

    async fn download_inner(
        &self,
        filename: &str,
        paths: &dyn PathProvider,
    ) -> ExchangeResult<DownloadOutcome> {
        if filename.trim().is_empty() {
            return Err(ExchangeError::EmptyFilename);
        }
        let endpoint = self.endpoints.main_url()?.clone();
        info!("Downloading file: {}", filename);
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if !cache.is_empty() && !cache.contains(filename) {
                warn!(filename, "File is not in the last listing");
            }
        }

        let token = self.resolve_token()?;
        let content = self.gateway.download(&endpoint, &token, filename).await?;

        let Some(path) = paths.save_path(filename) else {
            info!("Download cancelled.");
            return Ok(DownloadOutcome::Cancelled {
                filename: filename.to_string(),
            });
        };

        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| ExchangeError::local_io(&path, e))?;
        info!(
            "File '{}' downloaded and saved to {}.",
            filename,
            path.display()
        );

        Ok(DownloadOutcome::Saved {
            filename: filename.to_string(),
            path,
            bytes: content.len(),
        })
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn begin(&self, kind: OperationKind) -> ExchangeResult<InFlight<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let OperationState::InFlight(running) = *state {
            warn!("Rejected {}: {} already in progress", kind, running);
            return Err(ExchangeError::Busy(running));
        }
        *state = OperationState::InFlight(kind);
        drop(state);

        self.emit(ExchangeEvent::Started(kind));
        Ok(InFlight { state: &self.state })
    }

    fn finish<T>(&self, kind: OperationKind, result: &ExchangeResult<T>, cancelled: bool) {
        let completion = match result {
            Ok(_) if cancelled => Completion::Cancelled,
            Ok(_) => Completion::Succeeded,
            Err(e) => {
                error!(operation = %kind, "{}", e);
                Completion::Failed
            }
        };
        self.emit(ExchangeEvent::Finished { kind, completion });
    }

    fn resolve_token(&self) -> ExchangeResult<BearerToken> {
        self.credentials.resolve().map_err(|e| {
            error!("Error: {}", e);
            ExchangeError::from(e)
        })
    }

    fn emit(&self, event: ExchangeEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}
