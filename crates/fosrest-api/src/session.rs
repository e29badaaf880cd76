// Session lifecycle
//
// A `Session` is one authenticated conversation with one switch. It owns
// the token, the release negotiated at login, whether the chassis runs
// virtual fabrics, and the debug trace it records to or replays from.
//
//   LoggedOut -> LoggingIn -> LoggedIn -> LoggingOut -> LoggedOut
//                               |
//                               +--(device rejects token)--> LoggedOut
//
// Only `login`, `logout` and the client's `send` change it, and all of them
// take `&mut Session`, so a session never has two transitions in flight.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{AuthToken, Credentials};
use crate::client::FosClient;
use crate::error::Error;
use crate::trace::{DebugMode, SessionRecord, TraceAccess, TraceStore};
use crate::version::{FosVersion, MINIMUM_SUPPORTED};

/// Token installed for sessions logged in against a replayed trace.
const REPLAY_TOKEN: &str = "replay";

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    LoggingIn,
    LoggedIn,
    LoggingOut,
}

/// What a successful login established.
struct Established {
    token: AuthToken,
    version: FosVersion,
    vf_enabled: bool,
}

/// One authenticated conversation with one switch.
#[derive(Debug)]
pub struct Session {
    address: Url,
    state: SessionState,
    credentials: Option<Credentials>,
    token: Option<AuthToken>,
    version: Option<FosVersion>,
    vf_enabled: bool,
    minimum_version: FosVersion,
    debug_mode: DebugMode,
    debug_mode_chosen: bool,
    trace: Option<Arc<TraceStore>>,
}

impl Session {
    /// A logged-out session for the switch at `address`
    /// (e.g. `https://10.0.0.5`).
    pub fn new(address: Url) -> Self {
        Self {
            address,
            state: SessionState::LoggedOut,
            credentials: None,
            token: None,
            version: None,
            vf_enabled: false,
            minimum_version: MINIMUM_SUPPORTED,
            debug_mode: DebugMode::Off,
            debug_mode_chosen: false,
            trace: None,
        }
    }

    /// Refuse devices older than `minimum` instead of the default baseline.
    #[must_use]
    pub fn with_minimum_version(mut self, minimum: FosVersion) -> Self {
        self.minimum_version = minimum;
        self
    }

    /// Choose the debug behavior for this session's lifetime.
    ///
    /// Allowed once, while logged out. The trace file is opened here so a
    /// bad path or a conflicting mode surfaces before login.
    pub fn set_debug_mode(&mut self, mode: DebugMode) -> Result<(), Error> {
        if self.debug_mode_chosen {
            return Err(Error::config("debug mode can only be chosen once per session"));
        }
        if self.state != SessionState::LoggedOut {
            return Err(Error::config("debug mode must be chosen before login"));
        }

        self.trace = TraceStore::for_mode(&mode)?;
        self.debug_mode = mode;
        self.debug_mode_chosen = true;
        Ok(())
    }

    // ── Login / logout ───────────────────────────────────────────────

    /// Authenticate against the switch and negotiate the API version.
    ///
    /// When replaying a trace no network I/O happens: the device facts
    /// recorded in the trace are used instead.
    pub async fn login(&mut self, client: &FosClient, credentials: Credentials) -> Result<(), Error> {
        if self.state == SessionState::LoggedIn {
            return Err(Error::config("session is already logged in"));
        }

        self.state = SessionState::LoggingIn;
        let result = if self.is_replaying() {
            Ok(self.replay_login())
        } else {
            self.live_login(client, &credentials).await
        };

        match result {
            Ok(established) => {
                info!(
                    address = %self.address,
                    user = credentials.username(),
                    version = %established.version,
                    vf_enabled = established.vf_enabled,
                    replayed = self.is_replaying(),
                    "logged in"
                );
                self.token = Some(established.token);
                self.version = Some(established.version);
                self.vf_enabled = established.vf_enabled;
                self.credentials = Some(credentials);
                self.state = SessionState::LoggedIn;
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    async fn live_login(
        &self,
        client: &FosClient,
        credentials: &Credentials,
    ) -> Result<Established, Error> {
        let reply = client.login_exchange(&self.address, credentials).await?;

        let version = reply
            .version
            .as_deref()
            .and_then(|raw| raw.parse::<FosVersion>().ok())
            .filter(|v| v.supports(&self.minimum_version));
        let Some(version) = version else {
            let found = reply.version.unwrap_or_else(|| "unknown".to_owned());
            warn!(address = %self.address, %found, "device release is not supported, logging out");
            if let Err(e) = client.logout_exchange(&self.address, &reply.token).await {
                debug!(error = %e, "logout after version rejection failed");
            }
            return Err(Error::UnsupportedVersion {
                found,
                minimum: self.minimum_version.clone(),
            });
        };

        let vf_enabled = match client
            .probe_vf_enabled(&self.address, &reply.token, &version)
            .await
        {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(error = %e, "capability probe failed, assuming virtual fabrics are disabled");
                false
            }
        };

        if let Some(trace) = self.trace.as_ref().filter(|t| t.access() == TraceAccess::Record) {
            trace.record_session(SessionRecord {
                address: self.address.to_string(),
                version: version.clone(),
                vf_enabled,
            })?;
        }

        Ok(Established {
            token: reply.token,
            version,
            vf_enabled,
        })
    }

    fn replay_login(&self) -> Established {
        let recorded = self.trace.as_ref().and_then(|t| t.session());
        let (version, vf_enabled) = match recorded {
            Some(record) => (record.version, record.vf_enabled),
            None => {
                debug!("trace has no session record, assuming baseline release");
                (self.minimum_version.clone(), false)
            }
        };
        Established {
            token: AuthToken::new(REPLAY_TOKEN),
            version,
            vf_enabled,
        }
    }

    /// End the session. Best effort: the token is dropped locally even if
    /// the switch can't be told.
    pub async fn logout(&mut self, client: &FosClient) {
        if self.state != SessionState::LoggedIn {
            self.clear();
            return;
        }

        self.state = SessionState::LoggingOut;
        if let Some(token) = self.token.as_ref().filter(|_| !self.is_replaying()) {
            match client.logout_exchange(&self.address, token).await {
                Ok(()) => debug!(address = %self.address, "logged out"),
                Err(e) => warn!(address = %self.address, error = %e, "logout failed, dropping token"),
            }
        }
        self.clear();
    }

    /// Renew an expired token with the stored credentials.
    pub(crate) async fn relogin(&mut self, client: &FosClient) -> Result<(), Error> {
        let Some(credentials) = self.credentials.clone() else {
            self.invalidate();
            return Err(Error::Authentication {
                message: "token rejected and no credentials to log in again".into(),
            });
        };

        warn!(address = %self.address, "token rejected by device, logging in again");
        self.invalidate();
        self.login(client, credentials)
            .await
            .map_err(|e| Error::Authentication {
                message: format!("re-login after token expiry failed: {e}"),
            })
    }

    /// Forget the token after the device rejected it. Credentials are kept
    /// for a re-login.
    pub(crate) fn invalidate(&mut self) {
        self.token = None;
        self.version = None;
        self.state = SessionState::LoggedOut;
    }

    fn clear(&mut self) {
        self.invalidate();
        self.credentials = None;
        self.vf_enabled = false;
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Whether a token is held and requests can be sent.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::LoggedIn && self.token.is_some()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Release negotiated at login.
    pub fn version(&self) -> Option<&FosVersion> {
        self.version.as_ref()
    }

    pub fn minimum_version(&self) -> &FosVersion {
        &self.minimum_version
    }

    /// Whether the chassis has virtual fabrics enabled.
    pub fn vf_enabled(&self) -> bool {
        self.vf_enabled
    }

    pub fn debug_mode(&self) -> &DebugMode {
        &self.debug_mode
    }

    pub fn is_replaying(&self) -> bool {
        matches!(self.debug_mode, DebugMode::Replaying(_))
    }

    pub(crate) fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub(crate) fn trace(&self) -> Option<&Arc<TraceStore>> {
        self.trace.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Url::parse("https://10.0.0.5").unwrap())
    }

    #[test]
    fn new_session_is_logged_out() {
        let s = session();
        assert_eq!(s.state(), SessionState::LoggedOut);
        assert!(!s.is_active());
        assert!(s.version().is_none());
        assert_eq!(s.minimum_version(), &MINIMUM_SUPPORTED);
        assert_eq!(s.debug_mode(), &DebugMode::Off);
    }

    #[test]
    fn debug_mode_is_chosen_once() {
        let mut s = session();
        s.set_debug_mode(DebugMode::Off).unwrap();
        let err = s.set_debug_mode(DebugMode::Off).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn debug_mode_rejected_after_login_started() {
        let mut s = session();
        s.state = SessionState::LoggedIn;
        let err = s.set_debug_mode(DebugMode::Off).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn invalidate_keeps_credentials() {
        let mut s = session();
        s.state = SessionState::LoggedIn;
        s.token = Some(AuthToken::new("t"));
        s.credentials = Some(Credentials::new(
            "admin",
            secrecy::SecretString::from("pw".to_string()),
        ));

        s.invalidate();
        assert!(!s.is_active());
        assert!(s.credentials.is_some());

        s.clear();
        assert!(s.credentials.is_none());
    }
}
