// fosrest-api: Async Rust driver for the Fabric OS REST (RESTCONF) API
//
// Session management, request addressing, retry, response normalization
// and GET trace record/replay for Fabric OS switches.

pub mod auth;
pub mod client;
pub mod descriptor;
pub mod error;
pub mod normalize;
pub mod resource;
pub mod retry;
pub mod session;
pub mod sink;
pub mod trace;
pub mod transport;
pub mod uri;
pub mod version;

pub use auth::{AuthToken, Credentials};
pub use client::FosClient;
pub use descriptor::{Idempotency, Method, RequestDescriptor};
pub use error::Error;
pub use normalize::{DeviceError, Envelope, ErrorCode, NoOpRule, Normalizer, RawResponse};
pub use resource::{ResourceDef, ResourceMap, ResourceScope};
pub use retry::{AttemptFailure, RetryPolicy};
pub use session::{Session, SessionState};
pub use sink::{NullSink, TracingSink, Transaction, TransactionSink};
pub use trace::DebugMode;
pub use transport::{TlsMode, TransportConfig};
pub use uri::{Scope, UriBuilder, VfId};
pub use version::{FosVersion, MINIMUM_SUPPORTED};
