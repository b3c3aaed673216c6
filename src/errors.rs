//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! Failures are grouped by the subsystem that reports them:
//! - [`LoadError`]: fetching, reading or decoding a 3D asset
//! - [`TrackingError`]: acquiring the reference space or hit-test source
//! - [`SessionError`]: the platform refusing an AR session
//!
//! [`Error`] wraps all of them for callers that only want one type, and
//! [`Result<T>`] is an alias for `std::result::Result<T, Error>`.
//!
//! None of these ever escape the frame loop: asynchronous failures are caught
//! where they happen and turned into log lines or
//! [`EngineEvent`](crate::engine::EngineEvent)s.

use thiserror::Error;

/// Failure while turning an asset reference into a normalized scene graph.
#[derive(Error, Debug)]
pub enum LoadError {
    // ========================================================================
    // I/O & Network
    // ========================================================================
    /// The network request could not be completed.
    #[error("Failed to fetch asset: {0}")]
    Fetch(String),

    /// The server answered with a non-success status code.
    #[error("HTTP response error: status {status}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
    },

    /// Local file I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The reference cannot be resolved (unknown scheme, relative resource
    /// without a base location, HTTP support compiled out).
    #[error("Unsupported asset source: {0}")]
    UnsupportedSource(String),

    // ========================================================================
    // Format & Parsing
    // ========================================================================
    /// The payload is corrupt or not a glTF 2.0 scene.
    #[error("glTF decode error: {0}")]
    Decode(String),

    /// Data URI parsing error.
    #[error("Data URI error: {0}")]
    DataUri(String),

    /// The asset needs a compressed-geometry decoder that is not available.
    #[error("Compressed geometry decoder unavailable: {0}")]
    DecoderUnavailable(String),

    // ========================================================================
    // Async & Threading
    // ========================================================================
    /// A blocking decode task failed to complete.
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

/// Failure while acquiring the per-session surface tracking query.
///
/// These are logged and degrade the session to "no preview ever appears".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    /// The viewer reference space request was rejected.
    #[error("Reference space request failed: {0}")]
    ReferenceSpace(String),

    /// The hit-test source request was rejected.
    #[error("Hit-test source request failed: {0}")]
    HitTestSource(String),
}

/// The platform refused to start or check support for an AR session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The runtime rejected the session request.
    #[error("AR session request rejected: {0}")]
    Rejected(String),

    /// The requested session mode or feature is not supported.
    #[error("AR session unsupported: {0}")]
    Unsupported(String),
}

/// The umbrella error type of the crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Settings could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<gltf::Error> for LoadError {
    fn from(err: gltf::Error) -> Self {
        LoadError::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for LoadError {
    fn from(err: base64::DecodeError) -> Self {
        LoadError::DataUri(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<url::ParseError> for LoadError {
    fn from(err: url::ParseError) -> Self {
        LoadError::UnsupportedSource(err.to_string())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<tokio::task::JoinError> for LoadError {
    fn from(err: tokio::task::JoinError) -> Self {
        LoadError::TaskJoin(err.to_string())
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
