use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::traits::{DurableStorage, StorageError};

/// Durable storage backed by one JSON file per key
#[derive(Debug, Clone)]
pub struct FileStorage {
    storage_dir: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `storage_dir`
    pub fn new(storage_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let storage_dir = storage_dir.into();
        fs::create_dir_all(&storage_dir)?;
        Ok(Self { storage_dir })
    }

    /// Open the storage in the platform data directory
    /// (~/.local/share/userdesk on Linux, ~/Library/Application Support/userdesk on macOS)
    pub fn open_default() -> Result<Self, StorageError> {
        Self::new(Self::default_dir()?)
    }

    /// Platform data directory used when no directory is configured
    pub fn default_dir() -> Result<PathBuf, StorageError> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "userdesk") {
            return Ok(proj_dirs.data_dir().to_path_buf());
        }

        // Fallback to ~/.local/share/userdesk
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| StorageError::Unavailable("could not determine home directory".into()))?;
        Ok(PathBuf::from(home).join(".local").join("share").join("userdesk"))
    }

    /// Directory holding the stored keys
    pub fn dir(&self) -> &Path {
        &self.storage_dir
    }

    fn item_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.storage_dir.join(format!("{file_name}.json"))
    }
}

impl DurableStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.item_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.item_path(key);
        // Write then rename so readers never see a half-written value
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.item_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
