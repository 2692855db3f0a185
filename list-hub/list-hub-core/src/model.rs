//! Folders, items and the persisted document that holds them.
//!
//! Every mutation the server and the local client perform goes through the
//! operations on [`Document`] and [`Folder`], so both sides enforce the same
//! rules. [`normalize`] is the single place where a document read from disk
//! or received from a client is repaired.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{HubError, Result};

pub const DEFAULT_FOLDER_ID: &str = "default";
pub const DEFAULT_FOLDER_NAME: &str = "My List";
pub const DEFAULT_QUANTITY: &str = "1";
pub const DEFAULT_CATEGORY: &str = "General";

fn default_quantity() -> String {
    DEFAULT_QUANTITY.to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "default_category")]
    pub category: String,
}

/// User input for a new item. Missing fields fall back to the defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl NewItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListStats {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Folder {
    /// A new empty folder with a freshly generated id.
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            items: Vec::new(),
        }
    }

    pub fn seeded() -> Self {
        Self {
            id: DEFAULT_FOLDER_ID.to_string(),
            name: DEFAULT_FOLDER_NAME.to_string(),
            items: Vec::new(),
        }
    }

    pub fn item(&self, id: i64) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Millisecond timestamp, bumped past the highest id already in use.
    /// Falls back to the lowest free positive id once the top is taken.
    fn next_item_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let candidate = match self.items.iter().map(|item| item.id).max() {
            Some(max) if max >= now => max.checked_add(1),
            _ => Some(now),
        };
        candidate.unwrap_or_else(|| {
            let used: HashSet<i64> = self.items.iter().map(|item| item.id).collect();
            (1..i64::MAX).find(|id| !used.contains(id)).unwrap_or_default()
        })
    }

    /// Give every repeated item id after its first use a fresh one.
    fn reassign_duplicate_item_ids(&mut self) {
        let mut seen = HashSet::new();
        let repeats: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| !seen.insert(item.id))
            .map(|(idx, _)| idx)
            .collect();
        for idx in repeats {
            let id = self.next_item_id();
            self.items[idx].id = id;
        }
    }

    pub fn add_item(&mut self, new: NewItem) -> Result<Item> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(HubError::InvalidInput("Item name is required".to_string()));
        }
        let quantity = new
            .quantity
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(default_quantity);
        let category = new
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(default_category);
        let item = Item {
            id: self.next_item_id(),
            name: name.to_string(),
            quantity,
            completed: false,
            category,
        };
        self.items.push(item.clone());
        Ok(item)
    }

    pub fn toggle_item(&mut self, id: i64) -> Result<Item> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(HubError::item_not_found)?;
        item.completed = !item.completed;
        Ok(item.clone())
    }

    pub fn remove_item(&mut self, id: i64) -> Result<Item> {
        let idx = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(HubError::item_not_found)?;
        Ok(self.items.remove(idx))
    }

    /// Items whose name contains `query`, ignoring case. A blank query
    /// matches everything.
    pub fn visible_items(&self, query: &str) -> Vec<&Item> {
        let query = query.trim().to_lowercase();
        self.items
            .iter()
            .filter(|item| query.is_empty() || item.name.to_lowercase().contains(&query))
            .collect()
    }

    pub fn stats(&self) -> ListStats {
        let completed = self.items.iter().filter(|item| item.completed).count();
        ListStats {
            total: self.items.len(),
            completed,
            remaining: self.items.len() - completed,
        }
    }
}

/// Partial update for a folder; `None` leaves the field untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FolderUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<Item>>,
}

/// The persisted root: every folder plus the one currently displayed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub current_folder_id: String,
}

impl Default for Document {
    fn default() -> Self {
        Self::seeded()
    }
}

fn folder_name(name: &str, blank_message: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        Err(HubError::InvalidInput(blank_message.to_string()))
    } else {
        Ok(name.to_string())
    }
}

impl Document {
    pub fn seeded() -> Self {
        Self {
            folders: vec![Folder::seeded()],
            current_folder_id: DEFAULT_FOLDER_ID.to_string(),
        }
    }

    /// Validate a bulk-save payload. An absent or empty folder list is
    /// rejected; a missing or dangling current id falls back to the first
    /// folder.
    pub fn from_parts(folders: Option<Vec<Folder>>, current_folder_id: Option<String>) -> Result<Self> {
        let folders =
            folders.ok_or_else(|| HubError::InvalidInput("Invalid folders data".to_string()))?;
        if folders.is_empty() {
            return Err(HubError::InvalidInput(
                "Cannot save empty folders list".to_string(),
            ));
        }
        Ok(normalize(Self {
            folders,
            current_folder_id: current_folder_id.unwrap_or_default(),
        }))
    }

    pub fn folder(&self, id: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == id)
    }

    pub fn folder_mut(&mut self, id: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.id == id)
    }

    pub fn current_folder(&self) -> Option<&Folder> {
        self.folder(&self.current_folder_id)
    }

    pub fn current_folder_mut(&mut self) -> Option<&mut Folder> {
        let id = self.current_folder_id.clone();
        self.folder_mut(&id)
    }

    pub fn create_folder(&mut self, name: &str) -> Result<Folder> {
        let name = folder_name(name, "Folder name is required")?;
        let folder = Folder::new(name);
        self.folders.push(folder.clone());
        Ok(folder)
    }

    pub fn update_folder(&mut self, id: &str, update: FolderUpdate) -> Result<Folder> {
        let folder = self.folder_mut(id).ok_or_else(HubError::folder_not_found)?;
        let name = update
            .name
            .map(|name| folder_name(&name, "Folder name cannot be empty"))
            .transpose()?;
        if let Some(name) = name {
            folder.name = name;
        }
        if let Some(items) = update.items {
            folder.items = items;
        }
        Ok(folder.clone())
    }

    /// Remove a folder and return the (possibly repointed) current id.
    pub fn delete_folder(&mut self, id: &str) -> Result<String> {
        let idx = self
            .folders
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(HubError::folder_not_found)?;
        if self.folders.len() == 1 {
            return Err(HubError::Conflict(
                "Cannot delete the last folder".to_string(),
            ));
        }
        self.folders.remove(idx);
        if self.current_folder_id == id {
            self.current_folder_id = self.folders[0].id.clone();
        }
        Ok(self.current_folder_id.clone())
    }

    pub fn switch_folder(&mut self, id: &str) -> Result<()> {
        if self.folder(id).is_none() {
            return Err(HubError::folder_not_found());
        }
        self.current_folder_id = id.to_string();
        Ok(())
    }
}

/// Repair a document so it satisfies the invariants: at least one folder,
/// unique folder ids, unique item ids within each folder, and a current id
/// that resolves.
pub fn normalize(mut doc: Document) -> Document {
    let mut seen = HashSet::new();
    doc.folders.retain(|f| seen.insert(f.id.clone()));
    for folder in &mut doc.folders {
        folder.reassign_duplicate_item_ids();
    }
    if doc.folders.is_empty() {
        doc.folders.push(Folder::seeded());
    }
    if doc.folder(&doc.current_folder_id).is_none() {
        doc.current_folder_id = doc.folders[0].id.clone();
    }
    doc
}
