use list_hub::api;
use list_hub_core::client::{
    ApiClient, ClientError, FlushDispatch, LifecycleSignal, ListStore, RemoteStore,
};
use list_hub_core::storage::JsonFileStore;
use list_hub_core::{Document, FolderService, NewItem};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

async fn spawn_server(dir: &Path) -> (SocketAddr, PathBuf, JoinHandle<std::io::Result<()>>) {
    let data_file = dir.join("data").join("folders.json");
    let backend = JsonFileStore::open(data_file.clone()).unwrap();
    let app = api::app(Arc::new(Mutex::new(FolderService::new(backend))));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(axum::serve(listener, app.into_make_service()).into_future());
    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, data_file, server)
}

fn on_disk(path: &Path) -> Document {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

async fn wait_for_disk(path: &Path, check: impl Fn(&Document) -> bool) -> bool {
    for _ in 0..50 {
        if check(&on_disk(path)) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn health_root_and_cors() {
    let tempdir = tempfile::tempdir().unwrap();
    let (addr, data_file, server) = spawn_server(tempdir.path()).await;
    assert!(data_file.exists());

    let resp = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "OK");

    let resp = reqwest::Client::new()
        .get(format!("http://{}/api/folders", addr))
        .header("Origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let root: serde_json::Value = reqwest::get(format!("http://{}/", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        root["message"],
        "Server is running! Use /api/folders to access the API."
    );

    server.abort();
}

#[tokio::test]
async fn remote_store_round_trip() {
    let tempdir = tempfile::tempdir().unwrap();
    let (addr, data_file, server) = spawn_server(tempdir.path()).await;
    let mut store = RemoteStore::connect(ApiClient::new(format!("http://{}", addr)))
        .await
        .unwrap();
    assert_eq!(store.document(), &Document::seeded());

    let work = store.create_folder("Work").await.unwrap();
    store.switch_folder(&work.id).await.unwrap();
    assert_eq!(store.current_folder().unwrap().id, work.id);

    let pens = store
        .add_item(NewItem::named("Pens").with_quantity("10"))
        .await
        .unwrap();
    store.add_item(NewItem::named("Paper")).await.unwrap();
    store.toggle_item(pens.id).await;
    assert_eq!(store.stats().completed, 1);
    assert_eq!(store.visible_items("pa").len(), 1);

    store.rename_folder(&work.id, "Office").await.unwrap();
    assert_eq!(on_disk(&data_file), store.document().clone());
    assert_eq!(on_disk(&data_file).current_folder().unwrap().name, "Office");

    store.delete_item(pens.id).await;
    assert_eq!(store.current_folder().unwrap().items.len(), 1);

    store.delete_folder(&work.id).await.unwrap();
    assert_eq!(store.document().current_folder_id, "default");
    assert_eq!(on_disk(&data_file).folders.len(), 1);

    server.abort();
}

#[tokio::test]
async fn server_errors_reach_the_client() {
    let tempdir = tempfile::tempdir().unwrap();
    let (addr, _data_file, server) = spawn_server(tempdir.path()).await;
    let mut store = RemoteStore::connect(ApiClient::new(format!("http://{}", addr)))
        .await
        .unwrap();

    let err = store.delete_folder("default").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 400, .. }));
    assert_eq!(err.user_message(), "Cannot delete the last folder");

    let err = store.switch_folder("missing").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
    assert_eq!(err.user_message(), "Folder not found");

    let err = store.create_folder("   ").await.unwrap_err();
    assert_eq!(err.user_message(), "Folder name is required");
    assert_eq!(store.document(), &Document::seeded());

    server.abort();
}

#[tokio::test]
async fn lifecycle_flush_lands_on_disk() {
    let tempdir = tempfile::tempdir().unwrap();
    let (addr, data_file, server) = spawn_server(tempdir.path()).await;
    let api = ApiClient::new(format!("http://{}", addr));
    let mut store = RemoteStore::connect(api.clone()).await.unwrap();
    let trip = store.create_folder("Trip").await.unwrap();

    // another client removes the folder behind this store's back
    api.delete_folder(&trip.id).await.unwrap();
    assert_eq!(on_disk(&data_file).folders.len(), 1);

    assert_eq!(
        store.on_lifecycle(LifecycleSignal::Hidden),
        FlushDispatch::Spawned
    );
    assert_eq!(
        store.on_lifecycle(LifecycleSignal::Teardown),
        FlushDispatch::Skipped
    );

    assert!(wait_for_disk(&data_file, |doc| doc.folder(&trip.id).is_some()).await);

    server.abort();
}

#[tokio::test]
async fn each_adopted_state_gets_its_own_flush() {
    let tempdir = tempfile::tempdir().unwrap();
    let (addr, data_file, server) = spawn_server(tempdir.path()).await;
    let api = ApiClient::new(format!("http://{}", addr));
    let mut store = RemoteStore::connect(api.clone()).await.unwrap();

    assert_eq!(
        store.on_lifecycle(LifecycleSignal::Hidden),
        FlushDispatch::Spawned
    );
    // let the first push settle before the state moves on
    tokio::time::sleep(Duration::from_millis(200)).await;

    let trip = store.create_folder("Trip").await.unwrap();
    api.delete_folder(&trip.id).await.unwrap();
    assert!(on_disk(&data_file).folder(&trip.id).is_none());

    assert_eq!(
        store.on_lifecycle(LifecycleSignal::Teardown),
        FlushDispatch::Spawned
    );
    assert!(wait_for_disk(&data_file, |doc| doc.folder(&trip.id).is_some()).await);

    server.abort();
}

#[tokio::test]
async fn awkward_folder_ids_round_trip() {
    let tempdir = tempfile::tempdir().unwrap();
    let (addr, data_file, server) = spawn_server(tempdir.path()).await;
    let api = ApiClient::new(format!("http://{}", addr));
    let odd_id = "a?b/c#d%e f";

    let mut doc = Document::seeded();
    let mut folder = list_hub_core::Folder::new("Odd".to_string());
    folder.id = odd_id.to_string();
    doc.folders.push(folder);
    api.save_all(&doc).await.unwrap();

    let fetched = api.get_folder(odd_id).await.unwrap();
    assert_eq!(fetched.name, "Odd");

    let mut store = RemoteStore::connect(api.clone()).await.unwrap();
    store.switch_folder(odd_id).await.unwrap();
    assert_eq!(store.document().current_folder_id, odd_id);
    store.rename_folder(odd_id, "Even").await.unwrap();
    assert_eq!(on_disk(&data_file).folder(odd_id).unwrap().name, "Even");

    store.delete_folder(odd_id).await.unwrap();
    assert!(on_disk(&data_file).folder(odd_id).is_none());
    assert_eq!(store.document().current_folder_id, "default");

    server.abort();
}
