// Per-transaction records for an external log collaborator
//
// The client never formats or writes log files. After every `send` that
// got as far as a resolved path, failed or not, it hands a `Transaction` to
// the injected sink; the default sink turns it into one
// structured `tracing` event.

use std::fmt;

use tracing::{info, warn};

use crate::descriptor::RequestDescriptor;
use crate::error::Error;
use crate::normalize::{Envelope, RawResponse};

/// Target used by [`TracingSink`], for filtering with `RUST_LOG`.
pub const TRANSACTION_TARGET: &str = "fosrest::transaction";

/// Everything known about one transaction, successful or not.
#[derive(Debug, Clone, Copy)]
pub struct Transaction<'a> {
    pub descriptor: &'a RequestDescriptor,
    /// Path and query the request was sent to.
    pub path: &'a str,
    /// Last response received, or the recorded one when replayed. `None`
    /// when the device never answered.
    pub raw: Option<&'a RawResponse>,
    /// Normalized envelope, or the driver error the caller gets.
    pub outcome: Result<&'a Envelope, &'a Error>,
    /// Network attempts made; 0 when replayed.
    pub attempts: u32,
    pub replayed: bool,
}

/// Receives one record per transaction.
pub trait TransactionSink: Send + Sync + fmt::Debug {
    fn record(&self, transaction: &Transaction<'_>);
}

/// Sink that emits `tracing` events under [`TRANSACTION_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TransactionSink for TracingSink {
    fn record(&self, tx: &Transaction<'_>) {
        let method = tx.descriptor.method().as_str();
        let status = tx.raw.map(|raw| raw.status);
        match tx.outcome {
            Err(error) => warn!(
                target: TRANSACTION_TARGET,
                method,
                path = tx.path,
                status,
                attempts = tx.attempts,
                replayed = tx.replayed,
                %error,
                "transaction failed"
            ),
            Ok(Envelope::Error(err)) => warn!(
                target: TRANSACTION_TARGET,
                method,
                path = tx.path,
                status,
                attempts = tx.attempts,
                replayed = tx.replayed,
                code = %err.code,
                message = %err.message,
                "device reported an error"
            ),
            Ok(envelope) => info!(
                target: TRANSACTION_TARGET,
                method,
                path = tx.path,
                status,
                attempts = tx.attempts,
                replayed = tx.replayed,
                records = envelope.payload().len(),
                "transaction complete"
            ),
        }
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TransactionSink for NullSink {
    fn record(&self, _transaction: &Transaction<'_>) {}
}
