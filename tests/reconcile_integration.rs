//! Client reconciliation against a file-backed SQLite database
//!
//! Each "restart" opens a fresh connection through the storage factory, so the
//! database file is the only state shared between runs.

#![cfg(feature = "sqlite")]

use authgate::oauth::clients::{ClientPersistence, reconcile};
use authgate::oauth::types::ClientRegistration;
use authgate::storage::{ClientStore, StorageBackend, create_storage_backend};
use std::path::PathBuf;
use std::sync::Arc;

fn clients(json: &str) -> Vec<ClientRegistration> {
    serde_json::from_str(json).unwrap()
}

fn database_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "authgate-{}-{}.db",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    path
}

async fn open(path: &PathBuf) -> Arc<dyn ClientStore> {
    let backend = StorageBackend::Sqlite(format!("sqlite:{}", path.display()));
    create_storage_backend(backend).await.unwrap()
}

#[tokio::test]
async fn test_configuration_wins_across_restarts() {
    let path = database_path("reconcile-restarts");

    let first = clients(
        r#"[
            {"clientId": "web_app", "secret": "one", "scopes": ["read"]},
            {"clientId": "app1", "secret": "a", "tokenValidityInSeconds": 60}
        ]"#,
    );
    let store = open(&path).await;
    reconcile(&first, ClientPersistence::Persisted, store.clone())
        .await
        .unwrap();
    assert_eq!(
        store.list_client_ids().await.unwrap(),
        vec!["app1".to_string(), "web_app".to_string()]
    );
    drop(store);

    // second start: app1 is edited, web_app dropped from configuration
    let second = clients(
        r#"[{"clientId": "app1", "secret": "b", "scopes": ["read", "write"]}]"#,
    );
    let store = open(&path).await;
    let registry = reconcile(&second, ClientPersistence::Persisted, store.clone())
        .await
        .unwrap();

    let app1 = store.get_client("app1").await.unwrap().unwrap();
    assert_eq!(app1, second[0]);

    // clients no longer configured stay in storage
    assert!(store.get_client("web_app").await.unwrap().is_some());
    assert!(registry.authenticate("app1", "b").await.unwrap().is_some());
    assert!(registry.authenticate("app1", "a").await.unwrap().is_none());

    // a restart with unchanged configuration leaves the same state
    let store = open(&path).await;
    reconcile(&second, ClientPersistence::Persisted, store.clone())
        .await
        .unwrap();
    assert_eq!(store.list_clients().await.unwrap().len(), 2);
    assert_eq!(store.get_client("app1").await.unwrap().unwrap(), second[0]);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_in_memory_mode_leaves_database_untouched() {
    let path = database_path("reconcile-in-memory");
    let store = open(&path).await;

    let configured = clients(r#"[{"clientId": "web_app", "secret": "s"}]"#);
    let registry = reconcile(&configured, ClientPersistence::InMemory, store.clone())
        .await
        .unwrap();

    assert!(store.list_client_ids().await.unwrap().is_empty());
    assert_eq!(registry.client_ids().await.unwrap(), vec!["web_app".to_string()]);
    assert!(registry.authenticate("web_app", "s").await.unwrap().is_some());

    let _ = std::fs::remove_file(&path);
}
