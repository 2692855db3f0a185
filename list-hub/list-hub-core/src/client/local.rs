use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{ClientError, ListStore};
use crate::error::HubError;
use crate::model::{normalize, Document, Folder, FolderUpdate, Item, NewItem};

pub const FOLDERS_KEY: &str = "folders";
pub const CURRENT_FOLDER_KEY: &str = "currentFolderId";

/// String key/value storage on the device.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
}

/// One file per key inside a directory.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        match std::fs::read_to_string(self.dir.join(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        std::fs::write(self.dir.join(key), value)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ClientError::Storage("key/value store poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ClientError::Storage("key/value store poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store that lives entirely on the device. Every state change is written
/// to the key/value store right away.
pub struct LocalStore {
    kv: Box<dyn KeyValueStore>,
    doc: Document,
}

impl LocalStore {
    pub fn open(kv: Box<dyn KeyValueStore>) -> Self {
        let doc = restore(kv.as_ref());
        let store = Self { kv, doc };
        if let Err(err) = store.mirror() {
            warn!("could not write initial list state: {}", err);
        }
        store
    }

    fn mirror(&self) -> Result<(), ClientError> {
        write_document(self.kv.as_ref(), &self.doc)
    }

    /// Apply a folder-level change to a draft and adopt it only once it is
    /// mirrored.
    fn apply<T>(
        &mut self,
        change: impl FnOnce(&mut Document) -> Result<T, HubError>,
    ) -> Result<T, ClientError> {
        let mut draft = self.doc.clone();
        let out = change(&mut draft)?;
        write_document(self.kv.as_ref(), &draft)?;
        self.doc = draft;
        Ok(out)
    }

    /// Apply an item-level change to the current folder; failures are logged
    /// and leave the state untouched.
    fn apply_item<T>(
        &mut self,
        what: &str,
        change: impl FnOnce(&mut Folder) -> Result<T, HubError>,
    ) -> Option<T> {
        let result = self.apply(|doc| {
            doc.current_folder_mut()
                .ok_or_else(HubError::folder_not_found)
                .and_then(change)
        });
        match result {
            Ok(out) => Some(out),
            Err(err) => {
                warn!("failed to {}: {}", what, err);
                None
            }
        }
    }
}

fn write_document(kv: &dyn KeyValueStore, doc: &Document) -> Result<(), ClientError> {
    let folders = serde_json::to_string(&doc.folders)?;
    kv.set(FOLDERS_KEY, &folders)?;
    kv.set(CURRENT_FOLDER_KEY, &doc.current_folder_id)?;
    Ok(())
}

fn restore(kv: &dyn KeyValueStore) -> Document {
    let folders = match kv.get(FOLDERS_KEY) {
        Ok(Some(raw)) => serde_json::from_str::<Vec<Folder>>(&raw).unwrap_or_else(|err| {
            warn!("stored folders unreadable, starting fresh: {}", err);
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(err) => {
            warn!("could not read stored folders: {}", err);
            Vec::new()
        }
    };
    let current_folder_id = kv.get(CURRENT_FOLDER_KEY).ok().flatten().unwrap_or_default();
    debug!("restored {} folders from device", folders.len());
    normalize(Document {
        folders,
        current_folder_id,
    })
}

#[async_trait]
impl ListStore for LocalStore {
    fn document(&self) -> &Document {
        &self.doc
    }

    async fn refresh(&mut self) -> Result<(), ClientError> {
        self.doc = restore(self.kv.as_ref());
        Ok(())
    }

    async fn create_folder(&mut self, name: &str) -> Result<Folder, ClientError> {
        self.apply(|doc| doc.create_folder(name))
    }

    async fn rename_folder(&mut self, id: &str, name: &str) -> Result<Folder, ClientError> {
        let update = FolderUpdate {
            name: Some(name.to_string()),
            items: None,
        };
        self.apply(|doc| doc.update_folder(id, update))
    }

    async fn delete_folder(&mut self, id: &str) -> Result<(), ClientError> {
        self.apply(|doc| doc.delete_folder(id)).map(|_| ())
    }

    async fn switch_folder(&mut self, id: &str) -> Result<(), ClientError> {
        self.apply(|doc| doc.switch_folder(id))
    }

    async fn add_item(&mut self, item: NewItem) -> Option<Item> {
        self.apply_item("add item", |folder| folder.add_item(item))
    }

    async fn toggle_item(&mut self, item_id: i64) {
        self.apply_item("toggle item", |folder| folder.toggle_item(item_id));
    }

    async fn delete_item(&mut self, item_id: i64) {
        self.apply_item("delete item", |folder| folder.remove_item(item_id));
    }
}
