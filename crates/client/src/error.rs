//! Error taxonomy for exchange operations.
//!
//! Every gateway and orchestrator call resolves to one of these kinds; no
//! `reqwest` or `std::io` fault escapes untyped.

use std::path::PathBuf;

use thiserror::Error;

use crate::credentials::CredentialError;
use crate::orchestrator::OperationKind;

/// Errors reported by exchange operations.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// An endpoint URL or the bearer token is absent.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Submit was requested with no local file chosen.
    #[error("no file selected")]
    NoSelection,

    /// Download was requested with an empty file name.
    #[error("no file selected for download")]
    EmptyFilename,

    /// Another operation is still in flight.
    #[error("{0} already in progress")]
    Busy(OperationKind),

    /// DNS, connect, reset or timeout while talking to the endpoint.
    #[error("network error: {0}")]
    Transport(String),

    /// The endpoint answered with an unexpected status.
    #[error("request failed with status {status}: {body}")]
    HttpFailure {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// Download answered 404.
    #[error("file '{filename}' not found on the server")]
    NotFound {
        /// The requested remote file name.
        filename: String,
    },

    /// A 200 list response did not match the expected shape.
    #[error("invalid response from server: {reason}")]
    MalformedResponse {
        /// Parser diagnostic.
        reason: String,
        /// Response body, verbatim.
        body: String,
    },

    /// Reading the selected file or writing the download failed.
    #[error("local file error at {}: {source}", path.display())]
    LocalIo {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for exchange operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// Heading for a user-facing notification of this error.
    pub fn title(&self) -> &'static str {
        match self {
            ExchangeError::ConfigurationMissing(_) => "Configuration Error",
            ExchangeError::Transport(_) => "Network Error",
            ExchangeError::MalformedResponse { .. } => "API Error",
            _ => "Error",
        }
    }

    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExchangeError::LocalIo {
            path: path.into(),
            source,
        }
    }
}

impl From<CredentialError> for ExchangeError {
    fn from(err: CredentialError) -> Self {
        ExchangeError::ConfigurationMissing(err.to_string())
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        use std::error::Error as _;

        let kind = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };

        // reqwest's Display stops at the top level; the useful detail
        // (DNS failure, reset, ...) is further down the source chain.
        let mut detail = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }

        ExchangeError::Transport(format!("{}: {}", kind, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_missing_display() {
        let err = ExchangeError::ConfigurationMissing("SUPA_MAIN_API_URL is not set".to_string());
        assert_eq!(
            err.to_string(),
            "configuration missing: SUPA_MAIN_API_URL is not set"
        );
        assert_eq!(err.title(), "Configuration Error");
    }

    #[test]
    fn test_http_failure_display_keeps_body_verbatim() {
        let err = ExchangeError::HttpFailure {
            status: 500,
            body: "{\"error\":\"bucket offline\"}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "request failed with status 500: {\"error\":\"bucket offline\"}"
        );
        assert_eq!(err.title(), "Error");
    }

    #[test]
    fn test_not_found_display() {
        let err = ExchangeError::NotFound {
            filename: "gone.zip".to_string(),
        };
        assert_eq!(err.to_string(), "file 'gone.zip' not found on the server");
    }

    #[test]
    fn test_transport_title() {
        let err = ExchangeError::Transport("connection failed: refused".to_string());
        assert_eq!(err.title(), "Network Error");
    }

    #[test]
    fn test_malformed_response_title() {
        let err = ExchangeError::MalformedResponse {
            reason: "missing field `count`".to_string(),
            body: "{}".to_string(),
        };
        assert_eq!(err.title(), "API Error");
        assert!(err.to_string().contains("missing field `count`"));
    }

    #[test]
    fn test_local_io_display_and_source() {
        let err = ExchangeError::local_io(
            "/tmp/missing.bin",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert!(err.to_string().contains("/tmp/missing.bin"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_busy_display() {
        let err = ExchangeError::Busy(OperationKind::List);
        assert_eq!(err.to_string(), "list already in progress");
    }

    #[test]
    fn test_from_credential_error() {
        let err: ExchangeError = CredentialError::Missing("SUPA_AUTH_TOKEN".to_string()).into();
        assert!(matches!(err, ExchangeError::ConfigurationMissing(_)));
        assert!(err.to_string().contains("SUPA_AUTH_TOKEN"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExchangeError>();
    }
}
