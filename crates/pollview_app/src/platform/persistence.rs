//! The local [`ClientSession`] as a RON file in the state directory.

use std::path::{Path, PathBuf};

use pollview_core::{AdminIdentity, ClientSession};
use pollview_engine::{read_optional, AtomicFileWriter};
use pollview_logging::{pv_error, pv_info, pv_warn};
use serde::{Deserialize, Serialize};

pub const SESSION_FILENAME: &str = "session.ron";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedAdmin {
    id: u64,
    username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedSession {
    #[serde(default)]
    admin: Option<PersistedAdmin>,
    #[serde(default)]
    voted_polls: Vec<String>,
}

/// Missing, unreadable or corrupt files all yield an empty session.
pub(crate) fn load_session(state_dir: &Path) -> ClientSession {
    let path = state_dir.join(SESSION_FILENAME);
    let content = match read_optional(&path) {
        Ok(Some(text)) => text,
        Ok(None) => return ClientSession::new(),
        Err(err) => {
            pv_warn!("Failed to read session from {:?}: {}", path, err);
            return ClientSession::new();
        }
    };

    let persisted: PersistedSession = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            pv_warn!("Failed to parse session from {:?}: {}", path, err);
            return ClientSession::new();
        }
    };

    pv_info!(
        "Loaded session from {:?} ({} answered polls)",
        path,
        persisted.voted_polls.len()
    );
    ClientSession::restore(
        persisted.admin.map(|admin| AdminIdentity {
            id: admin.id,
            username: admin.username,
        }),
        persisted.voted_polls,
    )
}

pub(crate) fn save_session(state_dir: &Path, session: &ClientSession) {
    let persisted = PersistedSession {
        admin: session.admin().map(|admin| PersistedAdmin {
            id: admin.id,
            username: admin.username.clone(),
        }),
        voted_polls: session.voted_polls().map(str::to_string).collect(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&persisted, pretty) {
        Ok(text) => text,
        Err(err) => {
            pv_error!("Failed to serialize session: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(PathBuf::from(state_dir));
    if let Err(err) = writer.write(SESSION_FILENAME, &content) {
        pv_error!("Failed to write session to {:?}: {}", state_dir, err);
    }
}

pub(crate) fn clear_session(state_dir: &Path) {
    let writer = AtomicFileWriter::new(PathBuf::from(state_dir));
    if let Err(err) = writer.remove(SESSION_FILENAME) {
        pv_error!("Failed to remove session in {:?}: {}", state_dir, err);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn session_survives_a_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut session = ClientSession::new();
        session.sign_in(AdminIdentity {
            id: 3,
            username: "ada".into(),
        });
        session.record_vote("poll1");
        session.record_vote("pollB");

        save_session(temp.path(), &session);
        assert_eq!(load_session(temp.path()), session);
    }

    #[test]
    fn missing_or_corrupt_file_is_an_empty_session() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load_session(temp.path()), ClientSession::new());

        fs::write(temp.path().join(SESSION_FILENAME), "(admin: ").unwrap();
        assert_eq!(load_session(temp.path()), ClientSession::new());
    }

    #[test]
    fn clear_removes_the_file() {
        let temp = TempDir::new().unwrap();
        let mut session = ClientSession::new();
        session.record_vote("poll1");
        save_session(temp.path(), &session);

        clear_session(temp.path());
        assert!(!temp.path().join(SESSION_FILENAME).exists());
        assert_eq!(load_session(temp.path()), ClientSession::new());
    }
}
