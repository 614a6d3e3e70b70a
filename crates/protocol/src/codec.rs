//! Payload codec for the two transfer legs.
//!
//! Uploads travel inside a JSON body, so file content is base64 encoded
//! (standard alphabet, padded). Downloads arrive as the raw response body and
//! are written to disk untouched. The two legs are independent:
//! [`decode_download`] is not the inverse of [`encode_for_upload`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::Result;

/// Encode binary file content into ASCII text for the upload body.
pub fn encode_for_upload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Reverse [`encode_for_upload`].
///
/// The client never needs this on the wire; it exists so the encoding can be
/// checked in isolation.
pub fn decode_upload(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

/// Download bodies are raw file bytes; this is the identity.
#[inline]
pub fn decode_download<B: AsRef<[u8]>>(body: B) -> B {
    body
}
