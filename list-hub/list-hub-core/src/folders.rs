//! Folder persistence operations.
//!
//! Each operation loads the whole document, applies one mutation and saves
//! it back before returning, so a successful return means the write landed.

use tracing::{debug, info};

use crate::error::{HubError, Result};
use crate::model::{Document, Folder, FolderUpdate};
use crate::storage::{DocumentBackend, JsonFileStore};

pub struct FolderService<B = JsonFileStore> {
    backend: B,
}

impl<B: DocumentBackend> FolderService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// All folders and the current id. Never fails on an empty store.
    pub fn list(&self) -> Result<Document> {
        self.backend.load()
    }

    pub fn get(&self, id: &str) -> Result<Folder> {
        debug!("fetching folder {}", id);
        self.backend
            .load()?
            .folder(id)
            .cloned()
            .ok_or_else(HubError::folder_not_found)
    }

    pub fn create(&self, name: &str) -> Result<Folder> {
        let mut doc = self.backend.load()?;
        let folder = doc.create_folder(name)?;
        self.backend.save(doc)?;
        info!("created folder {} ({})", folder.name, folder.id);
        Ok(folder)
    }

    pub fn update(&self, id: &str, update: FolderUpdate) -> Result<Folder> {
        let mut doc = self.backend.load()?;
        let folder = doc.update_folder(id, update)?;
        self.backend.save(doc)?;
        debug!("updated folder {} ({} items)", folder.id, folder.items.len());
        Ok(folder)
    }

    /// Delete a folder and return the current id after the deletion.
    pub fn delete(&self, id: &str) -> Result<String> {
        let mut doc = self.backend.load()?;
        doc.delete_folder(id)?;
        let saved = self.backend.save(doc)?;
        info!("deleted folder {}, current is {}", id, saved.current_folder_id);
        Ok(saved.current_folder_id)
    }

    pub fn switch(&self, id: &str) -> Result<String> {
        let mut doc = self.backend.load()?;
        doc.switch_folder(id)?;
        let saved = self.backend.save(doc)?;
        debug!("current folder is now {}", saved.current_folder_id);
        Ok(saved.current_folder_id)
    }

    /// Overwrite the whole document with a client-provided state.
    pub fn save_all(
        &self,
        folders: Option<Vec<Folder>>,
        current_folder_id: Option<String>,
    ) -> Result<Document> {
        let doc = Document::from_parts(folders, current_folder_id)?;
        let saved = self.backend.save(doc)?;
        info!("saved full state with {} folders", saved.folders.len());
        Ok(saved)
    }
}
