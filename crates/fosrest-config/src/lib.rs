//! Device profiles for fosrest.
//!
//! TOML profiles, credential resolution (env + plaintext), and
//! translation to a runtime [`DeviceConfig`]: transport, retry pacing,
//! debug trace mode and credentials for one switch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use fosrest_api::{
    Credentials, DebugMode, FosVersion, MINIMUM_SUPPORTED, RetryPolicy, Session, TlsMode,
    TransportConfig,
};

/// Prefix for environment overrides, e.g. `FOSREST_DEFAULTS__TIMEOUT=30`.
pub const ENV_PREFIX: &str = "FOSREST_";
/// Fallback password variable when a profile names none.
pub const PASSWORD_ENV: &str = "FOSREST_PASSWORD";
/// Fallback username variable when a profile names none.
pub const USERNAME_ENV: &str = "FOSREST_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    /// Settings every profile inherits.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named switch profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .ok_or_else(|| invalid("default_profile", "no profile named and no default set"))?;
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| invalid("profile", format!("no profile named '{name}'")))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Seconds per network attempt.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept self-signed switch certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds to wait after a network failure or HTTP 503.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Seconds to wait after "The Fabric is busy".
    #[serde(default = "default_busy_delay")]
    pub busy_delay: u64,

    /// Seconds added to the wait for each further attempt.
    #[serde(default)]
    pub retry_increment: u64,

    /// Oldest Fabric OS release to accept.
    #[serde(default = "default_minimum_version")]
    pub minimum_version: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            insecure: default_insecure(),
            max_attempts: default_max_attempts(),
            retry_delay: default_retry_delay(),
            busy_delay: default_busy_delay(),
            retry_increment: 0,
            minimum_version: default_minimum_version(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}
fn default_insecure() -> bool {
    true
}
fn default_max_attempts() -> u32 {
    5
}
fn default_retry_delay() -> u64 {
    4
}
fn default_busy_delay() -> u64 {
    10
}
fn default_minimum_version() -> String {
    MINIMUM_SUPPORTED.to_string()
}

/// Debug trace behavior as written in a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugSetting {
    #[default]
    Off,
    Record,
    Replay,
}

/// A named switch profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Switch base URL (e.g., "https://10.0.0.5").
    pub address: String,

    pub username: Option<String>,

    /// Password (plaintext; prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override retry attempts.
    pub max_attempts: Option<u32>,

    /// Override minimum release.
    pub minimum_version: Option<String>,

    #[serde(default)]
    pub debug: DebugSetting,

    /// Trace file for `record` / `replay`.
    pub trace: Option<PathBuf>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "fosrest", "fosrest").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fosrest");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment. A missing file yields the
/// defaults with environment overrides applied.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve username + password for a profile.
///
/// Password order: the profile's `password_env` variable, then
/// `FOSREST_PASSWORD`, then the plaintext `password` field.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Result<Credentials, ConfigError> {
    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };

    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(no_credentials)?;

    let password = profile
        .password_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
        .or_else(|| std::env::var(PASSWORD_ENV).ok())
        .or_else(|| profile.password.clone())
        .ok_or_else(no_credentials)?;

    Ok(Credentials::new(username, SecretString::from(password)))
}

// ── Runtime config ──────────────────────────────────────────────────

/// Everything needed to open a session to one switch.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub address: Url,
    pub credentials: Credentials,
    pub transport: TransportConfig,
    pub debug: DebugMode,
    pub minimum_version: FosVersion,
}

impl DeviceConfig {
    /// A logged-out session with this profile's minimum release and debug
    /// mode applied.
    pub fn session(&self) -> Result<Session, fosrest_api::Error> {
        let mut session =
            Session::new(self.address.clone()).with_minimum_version(self.minimum_version.clone());
        session.set_debug_mode(self.debug.clone())?;
        Ok(session)
    }
}

/// Build a validated `DeviceConfig` from a profile and the global defaults.
pub fn profile_to_device_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<DeviceConfig, ConfigError> {
    let address: Url = profile
        .address
        .parse()
        .map_err(|_| invalid("address", format!("invalid URL: {}", profile.address)))?;
    if !matches!(address.scheme(), "http" | "https") {
        return Err(invalid(
            "address",
            format!("expected http or https, got '{}'", address.scheme()),
        ));
    }

    let credentials = resolve_credentials(profile, profile_name)?;

    let tls = match (profile.insecure, &profile.ca_cert) {
        (Some(true), _) => TlsMode::DangerAcceptInvalid,
        (_, Some(ca_path)) => TlsMode::CustomCa(ca_path.clone()),
        (Some(false), None) => TlsMode::System,
        (None, None) if defaults.insecure => TlsMode::DangerAcceptInvalid,
        (None, None) => TlsMode::System,
    };

    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(invalid("timeout", "must be at least one second"));
    }

    let max_attempts = profile.max_attempts.unwrap_or(defaults.max_attempts);
    if max_attempts == 0 {
        return Err(invalid("max_attempts", "must be at least 1"));
    }

    let minimum_raw = profile
        .minimum_version
        .as_deref()
        .unwrap_or(&defaults.minimum_version);
    let minimum_version: FosVersion = minimum_raw
        .parse()
        .map_err(|e| invalid("minimum_version", format!("{e}")))?;

    let debug = match (profile.debug, &profile.trace) {
        (DebugSetting::Off, _) => DebugMode::Off,
        (DebugSetting::Record, Some(path)) => DebugMode::Recording(path.clone()),
        (DebugSetting::Replay, Some(path)) => DebugMode::Replaying(path.clone()),
        (_, None) => return Err(invalid("trace", "debug mode needs a trace file path")),
    };

    Ok(DeviceConfig {
        address,
        credentials,
        transport: TransportConfig {
            tls,
            timeout: Duration::from_secs(timeout),
            retry: RetryPolicy {
                max_attempts,
                delay: Duration::from_secs(defaults.retry_delay),
                busy_delay: Duration::from_secs(defaults.busy_delay),
                increment: Duration::from_secs(defaults.retry_increment),
            },
        },
        debug,
        minimum_version,
    })
}
