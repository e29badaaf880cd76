// Fabric OS REST client
//
// Wraps `reqwest::Client` with the switch's RESTCONF conventions: the
// yang-data media type on every request, the session token on the
// `Authorization` header, bounded retry for reads, and one transparent
// re-login when the device drops a token mid-session. Every response is
// run through the normalizer before the caller sees it.
//
// The client holds no per-device state; one instance can serve sessions
// to any number of switches.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::{AuthToken, Credentials};
use crate::descriptor::{Method, RequestDescriptor};
use crate::error::Error;
use crate::normalize::{Envelope, Normalizer, RawResponse};
use crate::resource::ResourceMap;
use crate::retry::{AttemptFailure, RetryPolicy, RetryState};
use crate::session::Session;
use crate::sink::{TracingSink, Transaction, TransactionSink};
use crate::trace::{TraceAccess, TraceEntry, TraceKey};
use crate::transport::TransportConfig;
use crate::uri::{Scope, UriBuilder, validate_resource};
use crate::version::FosVersion;

/// Media type the switch answers in JSON for. Anything else yields XML.
pub const YANG_JSON: &str = "application/yang-data+json";

const LOGIN_PATH: &str = "/rest/login";
const LOGOUT_PATH: &str = "/rest/logout";

/// Resource read at login to learn whether virtual fabrics are enabled.
const CAPABILITY_PROBE: &str = "brocade-chassis/chassis";
const VF_ENABLED_LEAF: &str = "vf-enabled";

/// What the login exchange returned.
pub(crate) struct LoginReply {
    pub token: AuthToken,
    /// Raw release string, if the device sent one.
    pub version: Option<String>,
}

/// Outcome of transmitting one request, after retries.
struct Exchanged {
    raw: RawResponse,
    attempts: u32,
}

/// A transaction that produced an envelope.
struct Completed {
    raw: RawResponse,
    envelope: Envelope,
    attempts: u32,
}

/// A transaction that ended in a driver error.
struct Failed {
    error: Error,
    attempts: u32,
    /// Last response seen, if the device answered at all.
    raw: Option<RawResponse>,
}

impl From<Error> for Failed {
    fn from(error: Error) -> Self {
        Self {
            attempts: error.attempts().unwrap_or(0),
            error,
            raw: None,
        }
    }
}

/// HTTP client for the Fabric OS REST API.
#[derive(Debug, Clone)]
pub struct FosClient {
    http: reqwest::Client,
    timeout: Duration,
    retry: RetryPolicy,
    resources: ResourceMap,
    normalizer: Normalizer,
    sink: Arc<dyn TransactionSink>,
}

impl FosClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, transport))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// Timeout and retry settings are still taken from `transport`.
    pub fn with_client(http: reqwest::Client, transport: &TransportConfig) -> Self {
        Self {
            http,
            timeout: transport.timeout,
            retry: transport.retry.clone(),
            resources: ResourceMap::default(),
            normalizer: Normalizer::default(),
            sink: Arc::new(TracingSink),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TransactionSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn with_resources(mut self, resources: ResourceMap) -> Self {
        self.resources = resources;
        self
    }

    pub fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Transactions ─────────────────────────────────────────────────

    /// Perform one logical transaction and return its normalized result.
    ///
    /// Device-reported failures come back as `Ok(Envelope::Error(_))`;
    /// `Err` means the driver itself could not complete the exchange.
    /// Once the path resolves, every outcome is handed to the sink.
    pub async fn send(
        &self,
        session: &mut Session,
        descriptor: &RequestDescriptor,
    ) -> Result<Envelope, Error> {
        validate_resource(descriptor.resource())?;
        let path = self.resolve(session, descriptor)?;

        let replayed = session.is_replaying();
        let result = if replayed {
            Self::replay(session, descriptor, &path)
        } else {
            self.transact(session, descriptor, &path).await
        };

        match &result {
            Ok(done) => self.sink.record(&Transaction {
                descriptor,
                path: &path,
                raw: Some(&done.raw),
                outcome: Ok(&done.envelope),
                attempts: done.attempts,
                replayed,
            }),
            Err(failed) => self.sink.record(&Transaction {
                descriptor,
                path: &path,
                raw: failed.raw.as_ref(),
                outcome: Err(&failed.error),
                attempts: failed.attempts,
                replayed,
            }),
        }

        result.map(|done| done.envelope).map_err(|failed| failed.error)
    }

    fn resolve(&self, session: &Session, descriptor: &RequestDescriptor) -> Result<String, Error> {
        let version = session.version().ok_or(Error::NotLoggedIn)?;
        UriBuilder::with_minimum(&self.resources, version, session.minimum_version())?
            .build(descriptor.resource(), descriptor.scope())
    }

    fn replay(
        session: &Session,
        descriptor: &RequestDescriptor,
        path: &str,
    ) -> Result<Completed, Failed> {
        if !descriptor.is_read() {
            return Err(Error::ReplayWriteForbidden {
                method: descriptor.method().to_string(),
                path: path.to_owned(),
            }
            .into());
        }

        let key = TraceKey::new(descriptor.method(), path, descriptor.wire_body());
        let entry = session
            .trace()
            .and_then(|t| t.lookup(&key))
            .ok_or_else(|| Error::ReplayMiss {
                method: descriptor.method().to_string(),
                path: path.to_owned(),
            })?;

        trace!(path, "answered from trace");
        Ok(Completed {
            raw: entry.raw,
            envelope: entry.envelope,
            attempts: 0,
        })
    }

    /// Exchange with the device, renewing the token once on a 401, then
    /// normalize and record.
    async fn transact(
        &self,
        session: &mut Session,
        descriptor: &RequestDescriptor,
        path: &str,
    ) -> Result<Completed, Failed> {
        let mut exchanged = self.exchange_with_session(session, descriptor, path).await?;
        if exchanged.raw.status == 401 {
            let spent = exchanged.attempts;
            session.relogin(self).await.map_err(|error| Failed {
                error,
                attempts: spent,
                raw: Some(exchanged.raw.clone()),
            })?;
            let again = self
                .exchange_with_session(session, descriptor, path)
                .await
                .map_err(|error| Failed {
                    attempts: spent + error.attempts().unwrap_or(0),
                    error,
                    raw: None,
                })?;
            if again.raw.status == 401 {
                session.invalidate();
                return Err(Failed {
                    error: Error::Authentication {
                        message: "token rejected again after re-login".into(),
                    },
                    attempts: spent + again.attempts,
                    raw: Some(again.raw),
                });
            }
            exchanged = Exchanged {
                raw: again.raw,
                attempts: spent + again.attempts,
            };
        }

        let envelope =
            self.normalizer
                .normalize(descriptor.method(), descriptor.collection_key(), &exchanged.raw);

        if descriptor.method() == Method::Get {
            if let Some(store) = session
                .trace()
                .filter(|t| t.access() == TraceAccess::Record)
            {
                let entry = TraceEntry {
                    raw: exchanged.raw.clone(),
                    envelope: envelope.clone(),
                };
                let key = TraceKey::new(descriptor.method(), path, descriptor.wire_body());
                store
                    .append_exchange(key, entry)
                    .await
                    .map_err(|error| Failed {
                        error,
                        attempts: exchanged.attempts,
                        raw: Some(exchanged.raw.clone()),
                    })?;
            }
        }

        Ok(Completed {
            raw: exchanged.raw,
            envelope,
            attempts: exchanged.attempts,
        })
    }

    async fn exchange_with_session(
        &self,
        session: &Session,
        descriptor: &RequestDescriptor,
        path: &str,
    ) -> Result<Exchanged, Error> {
        let token = session.token().ok_or(Error::NotLoggedIn)?;
        self.exchange(session.address(), token, descriptor, path)
            .await
    }

    /// Transmit `descriptor` to `path`, repeating reads on transient
    /// failures as the retry policy allows.
    async fn exchange(
        &self,
        address: &Url,
        token: &AuthToken,
        descriptor: &RequestDescriptor,
        path: &str,
    ) -> Result<Exchanged, Error> {
        let url = address.join(path).map_err(|e| Error::InvalidResource {
            resource: descriptor.resource().to_owned(),
            reason: format!("cannot form a URL from {path}: {e}"),
        })?;
        let headers = request_headers(token)?;
        let timeout = descriptor.timeout().unwrap_or(self.timeout);
        let body = descriptor.wire_body();
        let method = descriptor.method();

        let mut state = RetryState::new();
        loop {
            let attempt = state.begin_attempt();
            debug!(%method, %url, attempt, "sending request");

            let mut request = self
                .http
                .request(method.into(), url.clone())
                .headers(headers.clone())
                .timeout(timeout);
            if let Some(body) = &body {
                request = request.body(body.clone());
            }

            let failure = match self.attempt(request).await {
                Ok(raw) => match AttemptFailure::from_response(&raw) {
                    Some(busy) if descriptor.is_read() => busy,
                    _ => {
                        return Ok(Exchanged {
                            raw,
                            attempts: attempt,
                        });
                    }
                },
                Err(failure) => failure,
            };

            let Some(delay) = state.fail(&self.retry, descriptor.is_read(), failure) else {
                debug!(
                    %method,
                    %url,
                    attempts = state.attempts(),
                    elapsed_ms = u64::try_from(state.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "giving up"
                );
                return Err(state.into_error());
            };
            warn!(
                %method,
                %url,
                attempt,
                failure = %state.last_failure().map(ToString::to_string).unwrap_or_default(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, request: reqwest::RequestBuilder) -> Result<RawResponse, AttemptFailure> {
        let resp = request
            .send()
            .await
            .map_err(|e| AttemptFailure::from_reqwest(&e))?;
        read_raw(resp).await
    }

    // ── Session exchanges ────────────────────────────────────────────

    /// `POST /rest/login` with basic credentials.
    pub(crate) async fn login_exchange(
        &self,
        address: &Url,
        credentials: &Credentials,
    ) -> Result<LoginReply, Error> {
        let url = join(address, LOGIN_PATH)?;
        debug!(%url, user = credentials.username(), "logging in");

        let resp = self
            .http
            .post(url)
            .basic_auth(credentials.username(), Some(credentials.password()))
            .header(ACCEPT, YANG_JSON)
            .header(CONTENT_TYPE, YANG_JSON)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Unreachable {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        let headers = resp.headers().clone();
        let raw = read_raw(resp).await.map_err(|failure| Error::Unreachable {
            address: address.to_string(),
            reason: failure.to_string(),
        })?;
        if !raw.is_success() {
            return Err(Error::Authentication {
                message: format!("login rejected (HTTP {}): {}", raw.status, raw.error_message()),
            });
        }

        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(AuthToken::new)
            .ok_or_else(|| Error::Authentication {
                message: "login response carried no Authorization token".into(),
            })?;

        Ok(LoginReply {
            token,
            version: release_from_headers(&headers),
        })
    }

    /// `POST /rest/logout` with `token`. A single attempt.
    pub(crate) async fn logout_exchange(&self, address: &Url, token: &AuthToken) -> Result<(), Error> {
        let url = join(address, LOGOUT_PATH)?;
        let resp = self
            .http
            .post(url)
            .headers(request_headers(token)?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Transport {
                attempts: 1,
                failure: AttemptFailure::from_reqwest(&e),
            })?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Authentication {
                message: format!("logout rejected (HTTP {})", status.as_u16()),
            })
        }
    }

    /// Read the chassis record with a fresh token and report `vf-enabled`.
    pub(crate) async fn probe_vf_enabled(
        &self,
        address: &Url,
        token: &AuthToken,
        version: &FosVersion,
    ) -> Result<bool, Error> {
        let descriptor = RequestDescriptor::get(CAPABILITY_PROBE, Scope::Chassis);
        let path = UriBuilder::with_minimum(&self.resources, version, version)?
            .build(descriptor.resource(), descriptor.scope())?;
        let exchanged = self.exchange(address, token, &descriptor, &path).await?;

        match self
            .normalizer
            .normalize(descriptor.method(), descriptor.collection_key(), &exchanged.raw)
            .into_result()
        {
            Ok(records) => Ok(records
                .first()
                .and_then(|chassis| chassis.get(VF_ENABLED_LEAF))
                .and_then(Value::as_bool)
                .unwrap_or(false)),
            Err(device) => Err(Error::Authentication {
                message: format!("capability probe rejected: {device}"),
            }),
        }
    }
}

/// Headers every authenticated request carries.
fn request_headers(token: &AuthToken) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, reqwest::header::HeaderValue::from_static(YANG_JSON));
    headers.insert(
        CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static(YANG_JSON),
    );
    headers.insert(AUTHORIZATION, token.header_value()?);
    Ok(headers)
}

fn join(address: &Url, path: &str) -> Result<Url, Error> {
    address.join(path).map_err(|e| Error::Config {
        message: format!("invalid device address {address}: {e}"),
    })
}

async fn read_raw(resp: reqwest::Response) -> Result<RawResponse, AttemptFailure> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| AttemptFailure::from_body_read(&e))?;
    Ok(RawResponse::new(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        body,
    ))
}

/// Release string from the login response: the `version=` parameter of
/// `Content-Type`, else the `Content-Version` header.
fn release_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| {
            ct.split(';')
                .skip(1)
                .filter_map(|param| param.split_once('='))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("version"))
                .map(|(_, value)| value.trim().trim_matches('"').to_owned())
        });

    from_content_type
        .or_else(|| {
            headers
                .get("content-version")
                .and_then(|v| v.to_str().ok())
                .map(|v| {
                    let v = v.trim();
                    v.strip_prefix("version=").unwrap_or(v).to_owned()
                })
        })
        .filter(|v| !v.is_empty())
}
