use std::path::PathBuf;

use thiserror::Error;

use crate::retry::AttemptFailure;
use crate::version::FosVersion;

/// Top-level error type for the `fosrest-api` crate.
///
/// Device-reported business errors are *not* represented here: they are
/// normalized into [`Envelope::Error`](crate::Envelope::Error) and handed back
/// to the caller as a successful `send`. Everything in this enum is a failure
/// of the driver itself (addressing, authentication, transport, debug trace).
#[derive(Debug, Error)]
pub enum Error {
    // ── Addressing ──────────────────────────────────────────────────
    /// Logical resource id is malformed. Raised before any network attempt.
    #[error("Invalid resource '{resource}': {reason}")]
    InvalidResource { resource: String, reason: String },

    /// Virtual fabric id out of range or reserved by the device.
    #[error("Invalid virtual fabric id {id}: {reason}")]
    InvalidVfId { id: u16, reason: &'static str },

    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, token missing, or re-login after expiry failed.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A request other than login was attempted without a live token.
    #[error("No active session -- login required")]
    NotLoggedIn,

    /// The device could not be reached during login.
    #[error("Device at {address} is unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    /// The device's API version predates the supported baseline.
    #[error("Unsupported device API version {found} (minimum supported: {minimum})")]
    UnsupportedVersion { found: String, minimum: FosVersion },

    // ── Transport ───────────────────────────────────────────────────
    /// The exchange failed; `attempts` counts every try that was made.
    #[error("Transport failed after {attempts} attempt(s): {failure}")]
    Transport {
        attempts: u32,
        failure: AttemptFailure,
    },

    /// TLS configuration or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Debug capture / replay ──────────────────────────────────────
    /// Replay mode has no recorded response for this request.
    #[error("No recorded response for {method} {path}")]
    ReplayMiss { method: String, path: String },

    /// Mutating requests cannot be replayed from a GET-only trace.
    #[error("{method} {path} is not allowed while replaying a trace")]
    ReplayWriteForbidden { method: String, path: String },

    /// Reading or appending the trace file failed.
    #[error("Trace file {}: {message}", path.display())]
    Trace { path: PathBuf, message: String },

    // ── Configuration ───────────────────────────────────────────────
    /// Misuse of the session API (debug mode switched mid-session, double login).
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Returns `true` if the device rejected our credentials or token.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::NotLoggedIn)
    }

    /// Returns `true` if the request gave up on a condition that may clear
    /// on its own (timeouts, dropped connections, busy fabric).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { failure, .. } => failure.is_transient(),
            Self::Unreachable { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` for errors detected before anything was transmitted.
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self,
            Self::InvalidResource { .. }
                | Self::InvalidVfId { .. }
                | Self::UnsupportedVersion { .. }
                | Self::NotLoggedIn
                | Self::ReplayMiss { .. }
                | Self::ReplayWriteForbidden { .. }
                | Self::Config { .. }
        )
    }

    /// Number of network attempts made, if the error came from the wire.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Transport { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    pub(crate) fn trace(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Trace {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
