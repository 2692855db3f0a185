use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::flush::{FlushDispatch, LifecycleSignal, UnloadFlush};
use super::{ClientError, ListStore};
use crate::model::{Document, Folder, FolderUpdate, Item, NewItem};

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentFolderBody {
    current_folder_id: String,
}

/// Thin typed wrapper over the `/api/folders` endpoints.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Same endpoint with a fresh connection pool, for use outside the
    /// runtime that created this client.
    pub fn detached(&self) -> Self {
        Self::new(self.base_url.clone())
    }

    /// `{base}/api/folders/{segments..}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, ClientError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|err| ClientError::InvalidUrl(format!("{}: {}", self.base_url, err)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["api", "folders"])
            .extend(segments);
        Ok(url)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn list_folders(&self) -> Result<Document, ClientError> {
        let resp = self.http.get(self.url(&[])?).send().await?;
        Self::decode(resp).await
    }

    pub async fn get_folder(&self, id: &str) -> Result<Folder, ClientError> {
        let resp = self.http.get(self.url(&[id])?).send().await?;
        Self::decode(resp).await
    }

    pub async fn create_folder(&self, name: &str) -> Result<Folder, ClientError> {
        let resp = self
            .http
            .post(self.url(&[])?)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn update_folder(
        &self,
        id: &str,
        update: &FolderUpdate,
    ) -> Result<Folder, ClientError> {
        let resp = self
            .http
            .put(self.url(&[id])?)
            .json(update)
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Returns the current folder id after the deletion.
    pub async fn delete_folder(&self, id: &str) -> Result<String, ClientError> {
        let resp = self.http.delete(self.url(&[id])?).send().await?;
        let body: CurrentFolderBody = Self::decode(resp).await?;
        Ok(body.current_folder_id)
    }

    pub async fn switch_folder(&self, id: &str) -> Result<String, ClientError> {
        let resp = self
            .http
            .put(self.url(&["current", id])?)
            .send()
            .await?;
        let body: CurrentFolderBody = Self::decode(resp).await?;
        Ok(body.current_folder_id)
    }

    pub async fn save_all(&self, doc: &Document) -> Result<Document, ClientError> {
        let resp = self
            .http
            .post(self.url(&["save"])?)
            .json(doc)
            .send()
            .await?;
        Self::decode(resp).await
    }
}

/// Store that writes through to the server and re-reads the document after
/// every successful mutation.
pub struct RemoteStore {
    api: ApiClient,
    doc: Document,
    flush: UnloadFlush,
}

impl RemoteStore {
    pub async fn connect(api: ApiClient) -> Result<Self, ClientError> {
        let doc = api.list_folders().await?;
        Ok(Self {
            api,
            doc,
            flush: UnloadFlush::new(),
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Best-effort push of the full state when the view is hidden or torn
    /// down. Never blocks; the write may be lost.
    pub fn on_lifecycle(&self, signal: LifecycleSignal) -> FlushDispatch {
        self.flush.fire(&self.api, self.doc.clone(), signal)
    }

    async fn sync(&mut self) -> Result<(), ClientError> {
        self.doc = self.api.list_folders().await?;
        self.flush.rearm();
        Ok(())
    }

    /// Replace the items of folder `id` on the server, then re-read.
    async fn push_items(&mut self, id: &str, items: Vec<Item>) -> Result<(), ClientError> {
        let update = FolderUpdate {
            name: None,
            items: Some(items),
        };
        self.api.update_folder(id, &update).await?;
        self.sync().await
    }

    /// Copy of the current folder to edit before pushing.
    fn draft(&self) -> Option<Folder> {
        let folder = self.doc.current_folder().cloned();
        if folder.is_none() {
            warn!("no current folder to edit");
        }
        folder
    }
}

#[async_trait]
impl ListStore for RemoteStore {
    fn document(&self) -> &Document {
        &self.doc
    }

    async fn refresh(&mut self) -> Result<(), ClientError> {
        self.sync().await
    }

    async fn create_folder(&mut self, name: &str) -> Result<Folder, ClientError> {
        let folder = self.api.create_folder(name).await?;
        self.sync().await?;
        Ok(folder)
    }

    async fn rename_folder(&mut self, id: &str, name: &str) -> Result<Folder, ClientError> {
        let update = FolderUpdate {
            name: Some(name.to_string()),
            items: None,
        };
        let folder = self.api.update_folder(id, &update).await?;
        self.sync().await?;
        Ok(folder)
    }

    async fn delete_folder(&mut self, id: &str) -> Result<(), ClientError> {
        let current = self.api.delete_folder(id).await?;
        debug!("deleted folder {}, server current is {}", id, current);
        self.sync().await
    }

    async fn switch_folder(&mut self, id: &str) -> Result<(), ClientError> {
        self.api.switch_folder(id).await?;
        self.sync().await
    }

    async fn add_item(&mut self, item: NewItem) -> Option<Item> {
        let mut folder = self.draft()?;
        let added = match folder.add_item(item) {
            Ok(added) => added,
            Err(err) => {
                warn!("item not added: {}", err);
                return None;
            }
        };
        if let Err(err) = self.push_items(&folder.id, folder.items).await {
            warn!("failed to add item: {}", err);
            return None;
        }
        self.doc
            .folder(&folder.id)
            .and_then(|f| f.item(added.id))
            .cloned()
    }

    async fn toggle_item(&mut self, item_id: i64) {
        let Some(mut folder) = self.draft() else {
            return;
        };
        if let Err(err) = folder.toggle_item(item_id) {
            warn!("failed to toggle item {}: {}", item_id, err);
            return;
        }
        if let Err(err) = self.push_items(&folder.id, folder.items).await {
            warn!("failed to toggle item {}: {}", item_id, err);
        }
    }

    async fn delete_item(&mut self, item_id: i64) {
        let Some(mut folder) = self.draft() else {
            return;
        };
        if let Err(err) = folder.remove_item(item_id) {
            warn!("failed to delete item {}: {}", item_id, err);
            return;
        }
        if let Err(err) = self.push_items(&folder.id, folder.items).await {
            warn!("failed to delete item {}: {}", item_id, err);
        }
    }
}
