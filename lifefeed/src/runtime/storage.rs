use std::error::Error;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories_next::BaseDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::feed::source::set_query_param;

pub const SESSION_STATE_VERSION: &str = "1";
pub const AUTO_UPDATE_PARAM: &str = "autoUpdate";

/// What a front end needs to pick the feed up where it left off.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct SessionState {
    pub version: String,
    pub auto_update: bool,
    pub last_shown: Option<u64>,
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            version: SESSION_STATE_VERSION.to_string(),
            auto_update: false,
            last_shown: None,
            saved_at: None,
        }
    }
}

impl SessionState {
    pub fn new(auto_update: bool, last_shown: Option<u64>) -> Self {
        Self {
            auto_update,
            last_shown,
            ..Self::default()
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|base| base.config_dir().join("Lifefeed"))
}

fn session_state_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join("session.json")
}

pub fn save_session_state(
    storage_dir: &Path,
    mut state: SessionState,
) -> Result<PathBuf, Box<dyn Error>> {
    state.saved_at = Some(Utc::now());
    let json = serde_json::to_string_pretty(&state)?;
    let path = session_state_path(storage_dir);
    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir)?;
    }
    fs::write(&path, json)?;
    Ok(path)
}

pub fn load_session_state(
    storage_dir: &Path,
) -> Result<SessionState, Box<dyn Error>> {
    let path = session_state_path(storage_dir);
    let json = fs::read_to_string(path)?;
    let state = serde_json::from_str::<SessionState>(&json)?;
    Ok(state)
}

pub fn load_session_state_if_exists(
    storage_dir: &Path,
) -> Result<Option<SessionState>, Box<dyn Error>> {
    match load_session_state(storage_dir) {
        Ok(state) => Ok(Some(state)),
        Err(err) => {
            if err
                .downcast_ref::<std::io::Error>()
                .is_some_and(|e| e.kind() == ErrorKind::NotFound)
            {
                Ok(None)
            } else {
                Err(err)
            }
        }
    }
}

/// The address a browser would show for `state`: `autoUpdate=on` while the
/// feed runs and the last shown generation under `cursor_param`.
pub fn resumable_url(
    base: &Url,
    cursor_param: &str,
    state: &SessionState,
) -> Url {
    let mut url = base.clone();

    let auto_update = state.auto_update.then_some("on");
    set_query_param(&mut url, AUTO_UPDATE_PARAM, auto_update);

    let cursor = state.last_shown.map(|sequence| sequence.to_string());
    set_query_param(&mut url, cursor_param, cursor.as_deref());

    url
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!(
            "lifefeed-{}-{}-{}",
            name,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn missing_session_is_not_an_error() {
        let dir = scratch_dir("missing");
        assert!(load_session_state_if_exists(&dir).unwrap().is_none());
    }

    #[test]
    fn saved_session_loads_back_with_timestamp() {
        let dir = scratch_dir("saved");
        let path =
            save_session_state(&dir, SessionState::new(true, Some(10)))
                .unwrap();
        assert!(path.ends_with("session.json"));

        let loaded = load_session_state_if_exists(&dir).unwrap().unwrap();
        assert!(loaded.auto_update);
        assert_eq!(loaded.last_shown, Some(10));
        assert!(loaded.saved_at.is_some());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_session_is_reported() {
        let dir = scratch_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(session_state_path(&dir), "{ nope").unwrap();

        assert!(load_session_state_if_exists(&dir).is_err());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn resumable_url_mirrors_mode_and_cursor() {
        let base = Url::parse("http://127.0.0.1:5000/live?size=20").unwrap();

        let running = resumable_url(
            &base,
            "serial",
            &SessionState::new(true, Some(10)),
        );
        assert_eq!(
            running.as_str(),
            "http://127.0.0.1:5000/live?size=20&autoUpdate=on&serial=10"
        );

        let stopped =
            resumable_url(&running, "serial", &SessionState::new(false, None));
        assert_eq!(stopped.as_str(), "http://127.0.0.1:5000/live?size=20");
    }
}
