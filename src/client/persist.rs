use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::state::Session;

const STATE_FILE: &str = "state.json";

fn default_dark_mode() -> bool {
    true
}

/// What survives a client restart: the signed-in user and the theme.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Persisted {
    #[serde(default)]
    pub user: Option<Session>,
    #[serde(default = "default_dark_mode")]
    pub dark_mode: bool,
}

impl Default for Persisted {
    fn default() -> Self {
        Self {
            user: None,
            dark_mode: default_dark_mode(),
        }
    }
}

pub struct PersistFile {
    path: PathBuf,
}

impl PersistFile {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file starts the client signed out.
    pub fn load(&self) -> Persisted {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Persisted::default(),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "could not read client state");
                return Persisted::default();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(error = %e, path = %self.path.display(), "discarding corrupt client state");
            Persisted::default()
        })
    }

    pub fn save(&self, persisted: &Persisted) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(persisted)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("JSON encode error: {e}")))?;
        fs::write(&self.path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("school_desk_{name}_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_and_corrupt_files_load_defaults() {
        let dir = scratch_dir("persist_missing");
        let file = PersistFile::in_dir(&dir);
        assert_eq!(file.load(), Persisted::default());
        assert!(file.load().dark_mode);

        fs::write(file.path(), "{not json").unwrap();
        assert_eq!(file.load(), Persisted::default());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_save_then_load_keeps_user_and_theme() {
        let dir = scratch_dir("persist_save");
        let file = PersistFile::in_dir(dir.join("nested"));
        let user = Session::from_user(json!({
            "_id": "s1",
            "name": "Sam",
            "email": "sam@x.com",
            "rollNum": 4,
            "role": "Student",
            "school": null,
            "sclassName": {"_id": "c1", "sclassName": "7A"},
            "examResult": [],
            "attendance": [],
        }))
        .unwrap();
        let persisted = Persisted {
            user: Some(user),
            dark_mode: false,
        };
        file.save(&persisted).unwrap();
        assert_eq!(file.load(), persisted);

        // An older file without the theme key keeps the dark default.
        fs::write(file.path(), r#"{"user": null}"#).unwrap();
        assert!(file.load().dark_mode);
        fs::remove_dir_all(dir).unwrap();
    }
}
