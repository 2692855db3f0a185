pub mod catalog;
pub mod client;
pub mod error;
pub mod folders;
pub mod model;
pub mod storage;

pub use error::{HubError, Result};
pub use folders::FolderService;
pub use model::{normalize, Document, Folder, FolderUpdate, Item, NewItem};
