use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use super::DocumentBackend;
use crate::error::{HubError, Result};
use crate::model::Document;

/// Stores the document as one pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`, creating the parent directory and seeding
    /// the file when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let store = Self { path };
        if !store.path.exists() {
            store.write(&Document::seeded())?;
            info!("initialized folder store at {:?}", store.path);
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DocumentBackend for JsonFileStore {
    fn read(&self) -> Result<Option<Document>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let doc = serde_json::from_str(&data)?;
        debug!("read folder store from {:?}", self.path);
        Ok(Some(doc))
    }

    fn write(&self, doc: &Document) -> Result<()> {
        // serialize fully before touching the file
        let data = serde_json::to_string_pretty(doc)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, data)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|err| {
                error!("failed to write folder store {:?}: {}", self.path, err);
                let _ = std::fs::remove_file(&tmp);
                HubError::from(err)
            })
    }
}
