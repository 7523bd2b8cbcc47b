//! Error types for the SheetDB client.
//!
//! # Design
//! Every failure mode the remote API can produce gets its own variant, so a
//! caller can tell "network down" apart from "wrong response shape". Callers
//! that only care about success can still collapse the result with `.ok()`.

use thiserror::Error;

/// Errors returned by `Connection` and `SheetDb` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, refused connection, TLS,
    /// or the body could not be read).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server returned 404. Usually an unknown api_id or sheet.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The body is not JSON, or a field has an unexpected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The decoded body is falsy (`null`, `false`, `0`, `""`, `"0"`, `[]`).
    #[error("response body is empty")]
    EmptyResponse,

    /// The decoded body lacks the field the operation unwraps.
    #[error("response has no `{0}` field")]
    MissingField(&'static str),
}
