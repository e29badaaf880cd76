// Debug capture and replay
//
// A session in `Recording` mode appends every GET it performs to a JSON
// Lines trace file; a later session in `Replaying` mode answers the same
// GETs from that file without a switch. The file is append-only: an
// updated answer for a key is written as a new line and the last line for
// a key wins when loading.
//
// One `TraceStore` exists per trace path per process. Sessions that share
// a path share the store, and its lock serializes their access.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::descriptor::Method;
use crate::error::Error;
use crate::normalize::{Envelope, RawResponse};
use crate::version::FosVersion;

/// Debug behavior of a session, fixed before login.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DebugMode {
    #[default]
    Off,
    /// Append every GET to the trace at this path.
    Recording(PathBuf),
    /// Answer GETs from the trace at this path; never touch the network.
    Replaying(PathBuf),
}

impl DebugMode {
    fn access(&self) -> Option<(&Path, TraceAccess)> {
        match self {
            Self::Off => None,
            Self::Recording(path) => Some((path.as_path(), TraceAccess::Record)),
            Self::Replaying(path) => Some((path.as_path(), TraceAccess::Replay)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceAccess {
    Record,
    Replay,
}

// ── Records ──────────────────────────────────────────────────────────

/// Identity of a recorded exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceKey {
    pub method: Method,
    /// Resolved path including the query string.
    pub path: String,
    /// Canonical JSON body, if one was sent.
    pub body: Option<String>,
}

impl TraceKey {
    pub fn new(method: Method, path: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
        }
    }
}

/// Recorded answer for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub raw: RawResponse,
    pub envelope: Envelope,
}

/// Device facts captured at login, used to log in offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub address: String,
    pub version: FosVersion,
    pub vf_enabled: bool,
}

/// One line of the trace file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TraceLine {
    Session {
        #[serde(flatten)]
        record: SessionRecord,
        recorded_at: DateTime<Utc>,
    },
    Exchange {
        method: Method,
        path: String,
        body: Option<String>,
        raw: RawResponse,
        envelope: Envelope,
        recorded_at: DateTime<Utc>,
    },
}

// ── Store ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct TraceState {
    session: Option<SessionRecord>,
    exchanges: IndexMap<TraceKey, TraceEntry>,
    /// Append handle; `None` when replaying.
    file: Option<File>,
}

/// In-memory view of one trace file plus its append handle.
#[derive(Debug)]
pub struct TraceStore {
    path: PathBuf,
    access: TraceAccess,
    state: Mutex<TraceState>,
}

static REGISTRY: LazyLock<Mutex<HashMap<PathBuf, Weak<TraceStore>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

impl TraceStore {
    /// Open the store `mode` refers to, or `None` for `DebugMode::Off`.
    pub fn for_mode(mode: &DebugMode) -> Result<Option<Arc<Self>>, Error> {
        mode.access()
            .map(|(path, access)| Self::open(path, access))
            .transpose()
    }

    /// Open (or join) the store for `path`.
    ///
    /// A path already open in the other mode is refused.
    pub fn open(path: &Path, access: TraceAccess) -> Result<Arc<Self>, Error> {
        let key = std::path::absolute(path).map_err(|e| Error::trace(path, e))?;
        let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(live) = registry.get(&key).and_then(Weak::upgrade) {
            if live.access != access {
                return Err(Error::config(format!(
                    "trace {} is already open for {}",
                    key.display(),
                    match live.access {
                        TraceAccess::Record => "recording",
                        TraceAccess::Replay => "replay",
                    }
                )));
            }
            return Ok(live);
        }

        let state = match access {
            TraceAccess::Record => load_for_append(&key)?,
            TraceAccess::Replay => load(&key, &read_existing(&key)?)?.state,
        };
        debug!(
            path = %key.display(),
            entries = state.exchanges.len(),
            ?access,
            "opened trace"
        );

        let store = Arc::new(Self {
            path: key.clone(),
            access,
            state: Mutex::new(state),
        });
        registry.retain(|_, weak| weak.strong_count() > 0);
        registry.insert(key, Arc::downgrade(&store));
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn access(&self) -> TraceAccess {
        self.access
    }

    /// Number of distinct recorded exchanges.
    pub fn len(&self) -> usize {
        self.lock().exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lookup(&self, key: &TraceKey) -> Option<TraceEntry> {
        self.lock().exchanges.get(key).cloned()
    }

    pub fn session(&self) -> Option<SessionRecord> {
        self.lock().session.clone()
    }

    /// Record an exchange. An identical entry already on file is left alone.
    pub fn record_exchange(&self, key: TraceKey, entry: TraceEntry) -> Result<(), Error> {
        let mut state = self.lock();
        if state.exchanges.get(&key) == Some(&entry) {
            return Ok(());
        }

        let line = TraceLine::Exchange {
            method: key.method,
            path: key.path.clone(),
            body: key.body.clone(),
            raw: entry.raw.clone(),
            envelope: entry.envelope.clone(),
            recorded_at: Utc::now(),
        };
        self.append(&mut state, &line)?;
        state.exchanges.insert(key, entry);
        Ok(())
    }

    /// [`record_exchange`](Self::record_exchange) on the blocking pool, so
    /// the file write and sync stay off the async worker.
    pub async fn append_exchange(
        self: &Arc<Self>,
        key: TraceKey,
        entry: TraceEntry,
    ) -> Result<(), Error> {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.record_exchange(key, entry))
            .await
            .map_err(|e| Error::trace(&self.path, e))?
    }

    pub fn record_session(&self, record: SessionRecord) -> Result<(), Error> {
        let mut state = self.lock();
        if state.session.as_ref() == Some(&record) {
            return Ok(());
        }

        let line = TraceLine::Session {
            record: record.clone(),
            recorded_at: Utc::now(),
        };
        self.append(&mut state, &line)?;
        state.session = Some(record);
        Ok(())
    }

    fn append(&self, state: &mut TraceState, line: &TraceLine) -> Result<(), Error> {
        let Some(file) = state.file.as_mut() else {
            return Err(Error::trace(&self.path, "trace is open read-only for replay"));
        };
        let mut buf = serde_json::to_string(line).map_err(|e| Error::trace(&self.path, e))?;
        buf.push('\n');
        file.write_all(buf.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| Error::trace(&self.path, e))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TraceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_existing(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|e| Error::trace(path, e))
}

/// Parsed trace file.
struct Loaded {
    state: TraceState,
    /// Bytes covered by complete, parsed lines.
    valid_len: usize,
    /// A partial final line (an interrupted append) was dropped.
    torn_tail: bool,
    /// The last kept line has no trailing newline.
    unterminated: bool,
}

fn load_for_append(path: &Path) -> Result<TraceState, Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::trace(path, e))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::trace(path, e))?;
    let loaded = load(path, &read_existing(path)?)?;

    if loaded.torn_tail {
        let len = u64::try_from(loaded.valid_len).map_err(|e| Error::trace(path, e))?;
        file.set_len(len).map_err(|e| Error::trace(path, e))?;
        warn!(path = %path.display(), len, "truncated torn trace tail");
    }
    if loaded.unterminated {
        file.write_all(b"\n").map_err(|e| Error::trace(path, e))?;
    }

    let mut state = loaded.state;
    state.file = Some(file);
    Ok(state)
}

/// Parse a trace. A malformed line is an error unless it is the final,
/// newline-less remainder of an append that never finished; that one is
/// dropped.
fn load(path: &Path, contents: &str) -> Result<Loaded, Error> {
    let mut state = TraceState::default();
    let mut valid_len = 0;
    let mut torn_tail = false;

    for (index, chunk) in contents.split_inclusive('\n').enumerate() {
        let line = chunk.trim();
        if line.is_empty() {
            valid_len += chunk.len();
            continue;
        }
        let parsed: TraceLine = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(e) if !chunk.ends_with('\n') => {
                warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %e,
                    "dropping incomplete final trace line"
                );
                torn_tail = true;
                break;
            }
            Err(e) => return Err(Error::trace(path, format!("line {}: {e}", index + 1))),
        };
        valid_len += chunk.len();

        match parsed {
            TraceLine::Session { record, .. } => state.session = Some(record),
            TraceLine::Exchange {
                method,
                path,
                body,
                raw,
                envelope,
                ..
            } => {
                state
                    .exchanges
                    .insert(TraceKey::new(method, path, body), TraceEntry { raw, envelope });
            }
        }
    }

    let unterminated = contents
        .get(..valid_len)
        .is_some_and(|kept| !kept.is_empty() && !kept.ends_with('\n'));
    Ok(Loaded {
        state,
        valid_len,
        torn_tail,
        unterminated,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn entry(name: &str) -> TraceEntry {
        let body = json!({"Response": {"chassis": {"name": name}}}).to_string();
        TraceEntry {
            raw: RawResponse::new(200, "OK", body),
            envelope: Envelope::Success(vec![json!({"name": name})]),
        }
    }

    fn key(path: &str) -> TraceKey {
        TraceKey::new(Method::Get, path, None)
    }

    #[test]
    fn recorded_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/trace.jsonl");

        {
            let store = TraceStore::open(&path, TraceAccess::Record).unwrap();
            store
                .record_session(SessionRecord {
                    address: "https://10.0.0.5/".into(),
                    version: "9.1.0".parse().unwrap(),
                    vf_enabled: true,
                })
                .unwrap();
            store
                .record_exchange(key("/rest/running/brocade-chassis/chassis"), entry("a"))
                .unwrap();
        }

        let replay = TraceStore::open(&path, TraceAccess::Replay).unwrap();
        assert_eq!(replay.len(), 1);
        assert_eq!(
            replay.lookup(&key("/rest/running/brocade-chassis/chassis")),
            Some(entry("a"))
        );
        assert!(replay.session().unwrap().vf_enabled);
        assert_eq!(replay.lookup(&key("/rest/running/other")), None);
    }

    #[test]
    fn identical_record_is_not_appended_and_last_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        let k = key("/rest/running/brocade-chassis/chassis");

        {
            let store = TraceStore::open(&path, TraceAccess::Record).unwrap();
            store.record_exchange(k.clone(), entry("a")).unwrap();
            store.record_exchange(k.clone(), entry("a")).unwrap();
            assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);

            store.record_exchange(k.clone(), entry("b")).unwrap();
            assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
            assert_eq!(store.len(), 1);
        }

        let replay = TraceStore::open(&path, TraceAccess::Replay).unwrap();
        assert_eq!(replay.lookup(&k), Some(entry("b")));
    }

    #[test]
    fn same_path_shares_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.jsonl");

        let first = TraceStore::open(&path, TraceAccess::Record).unwrap();
        let second = TraceStore::open(&path, TraceAccess::Record).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let err = TraceStore::open(&path, TraceAccess::Replay).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn replaying_a_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = TraceStore::open(&dir.path().join("absent.jsonl"), TraceAccess::Replay)
            .unwrap_err();
        assert!(matches!(err, Error::Trace { .. }));
    }

    #[test]
    fn malformed_line_names_its_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "\n{\"kind\":\"mystery\"}\n").unwrap();

        let err = TraceStore::open(&path, TraceAccess::Replay).unwrap_err();
        match err {
            Error::Trace { message, .. } => assert!(message.starts_with("line 2:"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn torn_trace(path: &Path) {
        let store = TraceStore::open(path, TraceAccess::Record).unwrap();
        store
            .record_exchange(key("/rest/running/brocade-chassis/chassis"), entry("a"))
            .unwrap();
        drop(store);

        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(br#"{"kind":"exchange","method":"GE"#).unwrap();
    }

    #[test]
    fn incomplete_final_line_is_dropped_on_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn.jsonl");
        torn_trace(&path);

        let replay = TraceStore::open(&path, TraceAccess::Replay).unwrap();
        assert_eq!(replay.len(), 1);
        assert_eq!(
            replay.lookup(&key("/rest/running/brocade-chassis/chassis")),
            Some(entry("a"))
        );
    }

    #[test]
    fn recording_resumes_after_incomplete_final_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.jsonl");
        torn_trace(&path);

        {
            let store = TraceStore::open(&path, TraceAccess::Record).unwrap();
            assert_eq!(store.len(), 1);
            store
                .record_exchange(key("/rest/running/brocade-fabric/switch"), entry("b"))
                .unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.ends_with('\n'));

        let replay = TraceStore::open(&path, TraceAccess::Replay).unwrap();
        assert_eq!(replay.len(), 2);
        assert_eq!(
            replay.lookup(&key("/rest/running/brocade-fabric/switch")),
            Some(entry("b"))
        );
    }

    #[test]
    fn unterminated_valid_line_is_kept_and_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unterminated.jsonl");
        {
            let store = TraceStore::open(&path, TraceAccess::Record).unwrap();
            store.record_exchange(key("/rest/a"), entry("a")).unwrap();
        }
        let trimmed = fs::read_to_string(&path).unwrap().trim_end().to_owned();
        fs::write(&path, trimmed).unwrap();

        {
            let store = TraceStore::open(&path, TraceAccess::Record).unwrap();
            store.record_exchange(key("/rest/b"), entry("b")).unwrap();
        }

        let replay = TraceStore::open(&path, TraceAccess::Replay).unwrap();
        assert_eq!(replay.len(), 2);
    }

    #[tokio::test]
    async fn append_exchange_runs_off_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("async.jsonl");

        let store = TraceStore::open(&path, TraceAccess::Record).unwrap();
        store
            .append_exchange(key("/rest/running/brocade-chassis/chassis"), entry("a"))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn replay_store_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.jsonl");
        fs::write(&path, "").unwrap();

        let store = TraceStore::open(&path, TraceAccess::Replay).unwrap();
        let err = store.record_exchange(key("/rest/x"), entry("a")).unwrap_err();
        assert!(matches!(err, Error::Trace { .. }));
    }

    #[test]
    fn off_mode_has_no_store() {
        assert!(TraceStore::for_mode(&DebugMode::Off).unwrap().is_none());
    }
}
