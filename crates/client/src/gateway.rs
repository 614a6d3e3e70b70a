//! Remote endpoint gateway.
//!
//! The three authenticated exchanges with the remote store: submit and list
//! against the unpack endpoint, download against the main endpoint. Each is a
//! JSON `POST` with its own timeout. Status handling:
//!
//! | Call     | 200                    | 404        | other          |
//! |----------|------------------------|------------|----------------|
//! | submit   | response text          | failure    | failure        |
//! | list     | parsed [`ListResponse`]| failure    | failure        |
//! | download | raw bytes              | `NotFound` | failure        |
//!
//! Every method takes a resolved [`BearerToken`], so no request can be built
//! before the credential check has passed.

use std::time::Duration;

use bytes::Bytes;
use protocol::{codec, DownloadRequest, ListRequest, ListResponse, SubmitRequest};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::debug;

use crate::config::HttpConfig;
use crate::credentials::BearerToken;
use crate::error::{ExchangeError, ExchangeResult};

/// User agent sent with every request.
const USER_AGENT: &str = concat!("file-exchange/", env!("CARGO_PKG_VERSION"));

/// Per-call request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub submit: Duration,
    pub list: Duration,
    pub download: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for Timeouts {
    fn from(http: &HttpConfig) -> Self {
        Self {
            submit: http.submit_timeout(),
            list: http.list_timeout(),
            download: http.download_timeout(),
        }
    }
}

/// Transport for the three remote exchanges.
///
/// Implementations must map every transport or status fault onto
/// [`ExchangeError`].
#[allow(async_fn_in_trait)]
pub trait RemoteGateway: Send + Sync {
    /// Upload encoded content. Returns the server's response text.
    async fn submit(
        &self,
        endpoint: &Url,
        token: &BearerToken,
        request: &SubmitRequest,
    ) -> ExchangeResult<String>;

    /// Request the current listing.
    async fn list(&self, endpoint: &Url, token: &BearerToken) -> ExchangeResult<ListResponse>;

    /// Fetch one file's content.
    async fn download(
        &self,
        endpoint: &Url,
        token: &BearerToken,
        filename: &str,
    ) -> ExchangeResult<Bytes>;
}

/// [`RemoteGateway`] over HTTPS using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    timeouts: Timeouts,
}

impl HttpGateway {
    pub fn new(timeouts: Timeouts) -> ExchangeResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ExchangeError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeouts })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &Url,
        token: &BearerToken,
        body: &T,
        timeout: Duration,
    ) -> ExchangeResult<reqwest::Response> {
        let response = self
            .client
            .post(endpoint.clone())
            .bearer_auth(token.as_str())
            .json(body)
            .timeout(timeout)
            .send()
            .await?;
        Ok(response)
    }
}

/// Turn a non-success response into `HttpFailure`, keeping the body verbatim.
async fn failure(status: StatusCode, response: reqwest::Response) -> ExchangeError {
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return e.into(),
    };
    ExchangeError::HttpFailure {
        status: status.as_u16(),
        body,
    }
}

impl RemoteGateway for HttpGateway {
    async fn submit(
        &self,
        endpoint: &Url,
        token: &BearerToken,
        request: &SubmitRequest,
    ) -> ExchangeResult<String> {
        debug!(
            operation = "submit",
            filename = %request.filename,
            encoded_len = request.input.len(),
            host = endpoint.host_str().unwrap_or_default(),
            "Sending upload"
        );

        let response = self.post(endpoint, token, request, self.timeouts.submit).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(failure(status, response).await);
        }
        Ok(response.text().await?)
    }

    async fn list(&self, endpoint: &Url, token: &BearerToken) -> ExchangeResult<ListResponse> {
        debug!(
            operation = "list",
            host = endpoint.host_str().unwrap_or_default(),
            "Requesting listing"
        );

        let response = self
            .post(endpoint, token, &ListRequest::default(), self.timeouts.list)
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(failure(status, response).await);
        }

        let body = response.bytes().await?;
        ListResponse::from_slice(&body).map_err(|e| ExchangeError::MalformedResponse {
            reason: e.to_string(),
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    async fn download(
        &self,
        endpoint: &Url,
        token: &BearerToken,
        filename: &str,
    ) -> ExchangeResult<Bytes> {
        debug!(
            operation = "download",
            filename,
            host = endpoint.host_str().unwrap_or_default(),
            "Requesting file"
        );

        let request = DownloadRequest {
            download: filename.to_string(),
        };
        let response = self
            .post(endpoint, token, &request, self.timeouts.download)
            .await?;

        match response.status() {
            StatusCode::OK => Ok(codec::decode_download(response.bytes().await?)),
            StatusCode::NOT_FOUND => Err(ExchangeError::NotFound {
                filename: filename.to_string(),
            }),
            status => Err(failure(status, response).await),
        }
    }
}
