//! Operation runners shared by the one-shot subcommands and the shell.
//!
//! Each runner reports its outcome on the terminal and returns whether the
//! operation succeeded.

use std::path::PathBuf;

use exchange_client::{
    DownloadOutcome, ExchangeClient, ListReport, OperationState, PathProvider, RemoteGateway,
};

use crate::output::{notify, notify_error, print_listing};

pub fn choose<G: RemoteGateway>(client: &ExchangeClient<G>, path: Option<PathBuf>) -> bool {
    match client.choose(path) {
        Some(selection) => {
            println!("Selected: {}", selection.display_name());
            true
        }
        None => {
            println!("No file selected");
            false
        }
    }
}

pub async fn submit<G: RemoteGateway>(client: &ExchangeClient<G>) -> bool {
    match client.submit().await {
        Ok(report) => {
            println!("{}", report.response);
            match report.refresh {
                Ok(listing) => show_listing(&listing),
                Err(e) => notify_error(&e),
            }
            true
        }
        Err(e) => {
            notify_error(&e);
            false
        }
    }
}

pub async fn list<G: RemoteGateway>(client: &ExchangeClient<G>, json: bool) -> bool {
    match client.list().await {
        Ok(listing) if json => match serde_json::to_string_pretty(&listing.entries) {
            Ok(text) => {
                println!("{}", text);
                true
            }
            Err(e) => {
                notify("Error", &e.to_string());
                false
            }
        },
        Ok(listing) => {
            show_listing(&listing);
            true
        }
        Err(e) => {
            notify_error(&e);
            false
        }
    }
}

pub async fn download<G: RemoteGateway>(
    client: &ExchangeClient<G>,
    filename: &str,
    paths: &dyn PathProvider,
) -> bool {
    match client.download(filename, paths).await {
        Ok(DownloadOutcome::Saved {
            filename,
            path,
            bytes,
        }) => {
            println!(
                "File '{}' downloaded and saved to {} ({} bytes).",
                filename,
                path.display(),
                bytes
            );
            true
        }
        Ok(DownloadOutcome::Cancelled { .. }) => {
            println!("Download cancelled.");
            true
        }
        Err(e) => {
            notify_error(&e);
            false
        }
    }
}

pub fn status<G: RemoteGateway>(client: &ExchangeClient<G>) {
    let state = match client.state() {
        OperationState::Idle => "idle".to_string(),
        OperationState::InFlight(kind) => format!("{} in progress", kind),
    };
    let selection = client
        .selection()
        .map(|s| s.path().display().to_string())
        .unwrap_or_else(|| "(none)".to_string());
    let endpoints = client.endpoints();

    println!("State:      {}", state);
    println!("Selection:  {}", selection);
    println!("Cached:     {} files", client.cached_count());
    println!("Unpack URL: {}", set_or_missing(endpoints.unpack_url().is_ok()));
    println!("Main URL:   {}", set_or_missing(endpoints.main_url().is_ok()));
    println!("Token:      {}", client.credentials().describe());
}

fn show_listing(listing: &ListReport) {
    println!("{}", listing.message);
    println!("Retrieved {} files.", listing.reported_count);
    print_listing(&listing.entries);
}

fn set_or_missing(set: bool) -> &'static str {
    if set {
        "set"
    } else {
        "missing"
    }
}
