//! Error types for the acquisition paths.

use reqwest::StatusCode;
use thiserror::Error;

/// The primary IP lookup failed. Shown to the user with a retry hint.
#[derive(Error, Debug)]
pub enum LookupError {
    /// Transport failure, or a body that was not the expected JSON.
    #[error("request to geolocation provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geolocation provider returned HTTP {0}")]
    Status(StatusCode),

    /// The provider answered but refused to locate the address.
    #[error("geolocation provider refused the lookup: {0}")]
    Provider(String),
}

/// Why an opposite-family echo lookup produced nothing.
///
/// Never leaves the resolver; the result is downgraded to single-stack.
#[derive(Error, Debug)]
pub enum EchoFailure {
    #[error("transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("unexpected address {0:?}")]
    WrongFamily(String),
}

/// A GPS request did not produce a fix.
///
/// Everything except [`GpsError::Unsupported`] moves the permission state to
/// denied; the variants only differ in the message shown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpsError {
    #[error("geolocation is not supported on this system")]
    Unsupported,

    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("timed out waiting for a position fix")]
    Timeout,
}
