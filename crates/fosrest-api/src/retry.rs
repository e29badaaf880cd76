// Retry classification and pacing
//
// Decides which failed attempts are worth repeating and how long to wait
// first. Only reads are ever repeated; the transport asks this module
// whether a given outcome is transient and for the delay before the next
// attempt.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::normalize::RawResponse;

/// Message fragment the device uses when a fabric-wide transaction lock
/// is held by someone else.
const FABRIC_BUSY: &str = "The Fabric is busy";

// ── Attempt failures ─────────────────────────────────────────────────

/// Why a single network attempt did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// No response within the per-attempt timeout.
    Timeout,
    /// Connection refused, reset or dropped mid-exchange.
    Connection(String),
    /// HTTP 503: the REST service is not accepting requests right now.
    ServiceUnavailable,
    /// HTTP 400 "The Fabric is busy".
    FabricBusy(String),
    /// Anything else the HTTP layer reported. Not retried.
    Other(String),
}

impl AttemptFailure {
    /// Classify a `reqwest` failure.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::Connection(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }

    /// Classify a failure while reading a response body. The status line
    /// already arrived, so short of a timeout the connection was cut.
    pub fn from_body_read(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Connection(err.to_string())
        }
    }

    /// Classify an HTTP response as a busy condition, if it is one.
    pub fn from_response(raw: &RawResponse) -> Option<Self> {
        match raw.status {
            503 => Some(Self::ServiceUnavailable),
            400 => {
                let message = raw.error_message();
                message
                    .contains(FABRIC_BUSY)
                    .then(|| Self::FabricBusy(message))
            }
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Busy conditions come with a response the caller may want to see.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::ServiceUnavailable | Self::FabricBusy(_))
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Connection(reason) => write!(f, "connection failed: {reason}"),
            Self::ServiceUnavailable => f.write_str("service unavailable (HTTP 503)"),
            Self::FabricBusy(message) => write!(f, "fabric busy: {message}"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

// ── Policy ───────────────────────────────────────────────────────────

/// Bounds and pacing for repeating a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Never below 1.
    pub max_attempts: u32,
    /// Base wait after a network failure or HTTP 503.
    pub delay: Duration,
    /// Base wait after "The Fabric is busy".
    pub busy_delay: Duration,
    /// Added to the base wait for every attempt after the first.
    pub increment: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(4),
            busy_delay: Duration::from_secs(10),
            increment: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// `attempts` tries with no waiting in between.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            max_attempts: attempts.max(1),
            delay: Duration::ZERO,
            busy_delay: Duration::ZERO,
            increment: Duration::ZERO,
        }
    }

    /// A single attempt, no retries.
    pub fn never() -> Self {
        Self::immediate(1)
    }

    /// Wait before the attempt following `attempt` (1-based) which failed
    /// with `failure`.
    pub fn delay_for(&self, attempt: u32, failure: &AttemptFailure) -> Duration {
        let base = match failure {
            AttemptFailure::FabricBusy(_) => self.busy_delay,
            _ => self.delay,
        };
        base + self.increment * attempt.saturating_sub(1)
    }
}

// ── Per-transaction state ────────────────────────────────────────────

/// Progress of one logical transaction through its attempts.
#[derive(Debug)]
pub struct RetryState {
    attempts: u32,
    started: Instant,
    last_failure: Option<AttemptFailure>,
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            last_failure: None,
        }
    }

    /// Count an attempt about to be made; returns its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Record a failed attempt. Returns the wait before the next attempt, or
    /// `None` when the transaction should give up.
    pub fn fail(
        &mut self,
        policy: &RetryPolicy,
        retryable: bool,
        failure: AttemptFailure,
    ) -> Option<Duration> {
        let next = (retryable
            && failure.is_transient()
            && self.attempts < policy.max_attempts.max(1))
        .then(|| policy.delay_for(self.attempts, &failure));
        self.last_failure = Some(failure);
        next
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        self.last_failure.as_ref()
    }

    /// Turn the final failure into the error the caller sees.
    pub fn into_error(self) -> crate::Error {
        crate::Error::Transport {
            attempts: self.attempts,
            failure: self
                .last_failure
                .unwrap_or_else(|| AttemptFailure::Other("no attempt was made".into())),
        }
    }
}
