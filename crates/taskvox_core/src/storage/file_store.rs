use crate::error::AppError;
use crate::storage::kv::KeyValueStore;
use std::path::{Path, PathBuf};

const STORE_DIR_ENV_VAR: &str = "TASKVOX_STORE_DIR";
const APP_DIR_NAME: &str = "taskvox";

/// Store directory named by `TASKVOX_STORE_DIR`, when set and non-blank.
pub fn store_dir_from_env() -> Option<PathBuf> {
    std::env::var(STORE_DIR_ENV_VAR)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

pub fn platform_store_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

/// Keeps each key in its own JSON file under one directory.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name_for_key(key))
    }
}

/// Maps a key to its file name. One leading `@` is dropped, so `@tasks` and
/// `tasks` share `tasks.json`; past that the mapping is one-to-one. Bytes
/// outside `[A-Za-z0-9_-.]` (including `~`) and dots at either end become
/// `~xx` hex escapes, so no name can leave the directory.
fn file_name_for_key(key: &str) -> String {
    let stem = key.strip_prefix('@').unwrap_or(key);
    if stem.is_empty() {
        return "store.json".to_string();
    }

    let last = stem.len() - 1;
    let mut name = String::with_capacity(stem.len());
    for (index, byte) in stem.bytes().enumerate() {
        let edge_dot = byte == b'.' && (index == 0 || index == last);
        if !edge_dot && (byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.')) {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("~{byte:02x}"));
        }
    }
    format!("{name}.json")
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|err| AppError::storage(format!("{}: {}", path.display(), err)))?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|err| AppError::storage(format!("{}: {}", self.dir.display(), err)))?;

        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, value)
            .map_err(|err| AppError::storage(format!("{}: {}", staging.display(), err)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&staging, permissions)
                .map_err(|err| AppError::storage(err.to_string()))?;
        }

        std::fs::rename(&staging, &path)
            .map_err(|err| AppError::storage(format!("{}: {}", path.display(), err)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|err| AppError::storage(format!("{}: {}", path.display(), err)))?;
        }
        Ok(())
    }
}
