//! Client-side state stores.
//!
//! A presentation layer owns one [`ListStore`] and drives it through the
//! narrow mutation API below. [`RemoteStore`] mirrors every change to the
//! HTTP API and adopts the server's answer; [`LocalStore`] keeps state on
//! the device.
//!
//! Folder operations report failures so they can be shown to the user. Item
//! operations only log them.

pub mod flush;
pub mod local;
pub mod remote;

pub use flush::{FlushDispatch, LifecycleSignal, UnloadFlush};
pub use local::{FileKeyValueStore, KeyValueStore, LocalStore, MemoryKeyValueStore};
pub use remote::{ApiClient, RemoteStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::error::HubError;
use crate::model::{Document, Folder, Item, ListStats, NewItem};

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with an error status.
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Rejected(#[from] HubError),

    #[error("local storage error: {0}")]
    Storage(String),

    #[error("invalid server url {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Text suitable for an alert: the server's message when there is one,
    /// otherwise a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } if !message.is_empty() => message.clone(),
            ClientError::Rejected(HubError::Storage(_)) => GENERIC_FAILURE.to_string(),
            ClientError::Rejected(err) => err.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

#[async_trait]
pub trait ListStore: Send {
    fn document(&self) -> &Document;

    fn current_folder(&self) -> Option<&Folder> {
        self.document().current_folder()
    }

    /// Items of the current folder whose name matches `query`.
    fn visible_items(&self, query: &str) -> Vec<Item> {
        self.current_folder()
            .map(|f| f.visible_items(query).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    fn stats(&self) -> ListStats {
        self.current_folder().map(Folder::stats).unwrap_or_default()
    }

    async fn refresh(&mut self) -> Result<(), ClientError>;

    async fn create_folder(&mut self, name: &str) -> Result<Folder, ClientError>;

    async fn rename_folder(&mut self, id: &str, name: &str) -> Result<Folder, ClientError>;

    async fn delete_folder(&mut self, id: &str) -> Result<(), ClientError>;

    async fn switch_folder(&mut self, id: &str) -> Result<(), ClientError>;

    /// Add to the current folder. `None` when the item was rejected or could
    /// not be stored.
    async fn add_item(&mut self, item: NewItem) -> Option<Item>;

    async fn toggle_item(&mut self, item_id: i64);

    async fn delete_item(&mut self, item_id: i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_server_text() {
        let err = ClientError::Api {
            status: 400,
            message: "Cannot delete the last folder".into(),
        };
        assert_eq!(err.user_message(), "Cannot delete the last folder");

        let err = ClientError::Api {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE);

        let err = ClientError::from(HubError::InvalidInput("Folder name is required".into()));
        assert_eq!(err.user_message(), "Folder name is required");

        let err = ClientError::Storage("disk full".into());
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }
}
