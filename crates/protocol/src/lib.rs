//! # File Exchange Protocol Library
//!
//! Wire definitions shared by the file exchange client and its tooling.
//!
//! ## Overview
//!
//! The remote store exposes two HTTP endpoints, both spoken to with
//! authenticated JSON `POST`s:
//!
//! - the **unpack** endpoint accepts uploads ([`SubmitRequest`]) and answers
//!   listing requests ([`ListRequest`] → [`ListResponse`]);
//! - the **main** endpoint returns raw file content for a [`DownloadRequest`].
//!
//! ```text
//! ┌──────────────┐  {"input": <base64>, "filename": ..}  ┌──────────────────┐
//! │              │ ────────────────────────────────────▶ │                  │
//! │    client    │  {"cmd": "list"}                      │ unpack endpoint  │
//! │              │ ────────────────────────────────────▶ │                  │
//! │              │ ◀──── {"message", "files", "count"}── └──────────────────┘
//! │              │  {"download": <name>}                 ┌──────────────────┐
//! │              │ ────────────────────────────────────▶ │  main endpoint   │
//! │              │ ◀──────────── raw bytes ───────────── └──────────────────┘
//! └──────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{codec, ListResponse, SubmitRequest};
//!
//! let request = SubmitRequest {
//!     input: codec::encode_for_upload(b"hello"),
//!     filename: "hello.txt".to_string(),
//! };
//! assert_eq!(request.input, "aGVsbG8=");
//!
//! let listing = ListResponse::from_slice(br#"{"message":"ok","files":[],"count":0}"#).unwrap();
//! assert_eq!(listing.count, 0);
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: Request and response bodies
//! - [`codec`]: Upload encoding and download pass-through
//! - [`error`]: Error types

pub mod codec;
pub mod error;
pub mod messages;

pub use error::{ProtocolError, Result};
pub use messages::{
    DownloadRequest, FileInfo, FileMetadata, ListRequest, ListResponse, RemoteFileEntry,
    SubmitRequest, LIST_COMMAND,
};
