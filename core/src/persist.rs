//! JSON-file persistence shared by the state containers.
//!
//! Every container stores `{"state": {...}, "version": 0}`. Persistence is
//! best effort: failures are logged at warn and the in-memory state stays
//! authoritative.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub(crate) const STATE_VERSION: u32 = 0;

#[derive(Serialize, Deserialize)]
struct Persisted<S> {
    state: S,
    #[serde(default)]
    version: u32,
}

/// Read the state persisted at `path`. Missing, unreadable, and corrupt
/// files all yield `None`.
pub(crate) fn load<S: DeserializeOwned>(path: &Path, what: &str) -> Option<S> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read persisted {what}");
            return None;
        }
    };
    match serde_json::from_str::<Persisted<S>>(&raw) {
        Ok(persisted) => Some(persisted.state),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt persisted {what}");
            None
        }
    }
}

pub(crate) fn save<S: Serialize>(path: &Path, state: &S, what: &str) {
    let persisted = Persisted {
        state,
        version: STATE_VERSION,
    };
    let result = serde_json::to_string(&persisted)
        .map_err(std::io::Error::other)
        .and_then(|json| std::fs::write(path, json));
    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "failed to persist {what}");
    }
}

pub(crate) fn remove(path: &Path, what: &str) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove persisted {what}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        n: u32,
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");
        save(&path, &Counter { n: 3 }, "counter");

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"state": {"n": 3}, "version": 0}));
        assert_eq!(load::<Counter>(&path, "counter"), Some(Counter { n: 3 }));
    }

    #[test]
    fn missing_version_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");
        std::fs::write(&path, r#"{"state":{"n":1}}"#).unwrap();
        assert_eq!(load::<Counter>(&path, "counter"), Some(Counter { n: 1 }));
    }

    #[test]
    fn remove_missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        remove(&dir.path().join("nothing.json"), "counter");
        assert_eq!(load::<Counter>(&dir.path().join("nothing.json"), "counter"), None);
    }
}
