//! Two devices syncing through an in-process server.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;
use zeroize::Zeroizing;

use nervos_client::{Client, ClientConfig, ClientError, Phase};
use nervos_server::{serve_listener, AppState, ChunkLog, MemoryObjectStore, ServerConfig};
use nervos_shared::Item;

async fn start_server() -> String {
    start_server_with_capacity(ServerConfig::default().chunk_capacity).await
}

async fn start_server_with_capacity(chunk_capacity: usize) -> String {
    let config = ServerConfig {
        bcrypt_cost: 4,
        chunk_capacity,
        ..ServerConfig::default()
    };
    let store = Arc::new(MemoryObjectStore::new());
    let log = ChunkLog::new(store, config.chunk_capacity, config.bcrypt_cost);
    let state = AppState {
        log: Arc::new(log),
        config: Arc::new(config),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        serve_listener(state, listener).await.unwrap();
    });
    url
}

/// A device whose background sync never fires during the test; cycles are
/// driven explicitly with `sync_now`.
async fn device(url: &str, dir: &TempDir, name: &str, password: &str) -> Client {
    let config = ClientConfig {
        server_url: url.to_string(),
        sync_interval: Duration::from_secs(3600),
        locked_poll: Duration::from_secs(3600),
        save_delay: Duration::from_millis(50),
        request_timeout: Duration::from_secs(10),
        db_path: Some(dir.path().join(format!("{name}.db"))),
    };
    let client = Client::open(config).unwrap();
    client
        .login("alice", Zeroizing::new(password.to_string()))
        .await
        .unwrap();
    assert_eq!(client.phase(), Phase::Unlocked);
    client
}

/// Place an item with a fixed id/revision on a device, as if edited there.
fn put_local(client: &Client, item: Item) {
    let ctx = client.context();
    let keys = ctx.keys().unwrap();
    let mut state = ctx.state().unwrap();
    ctx.db().unwrap().save_item(keys.data_secret(), &item).unwrap();
    state.items.insert(item.id, item);
}

fn stored(client: &Client, id: i64) -> Option<Item> {
    let ctx = client.context();
    let keys = ctx.keys().unwrap();
    let db = ctx.db().unwrap();
    db.get_item(keys.data_secret(), id).unwrap()
}

fn item(id: i64, rev: i64, data: &str) -> Item {
    Item {
        id,
        rev,
        data: data.to_string(),
    }
}

#[tokio::test]
async fn test_two_devices_converge_by_revision() {
    let url = start_server().await;
    let dir = TempDir::new().unwrap();
    let a = device(&url, &dir, "a", "correct horse").await;
    let b = device(&url, &dir, "b", "correct horse").await;

    // A creates the note and syncs from scratch.
    put_local(&a, item(100, 100, "hello"));
    let stats = a.sync_now().await.unwrap();
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.checkpoint, 100);

    // B receives it.
    let stats = b.sync_now().await.unwrap();
    assert_eq!(stats.uploaded, 0);
    assert_eq!(stats.checkpoint, 100);
    assert_eq!(b.note(100).unwrap(), Some(item(100, 100, "hello")));
    assert_eq!(stored(&b, 100), Some(item(100, 100, "hello")));
    assert_eq!(b.context().settings().unwrap().last_sync, 100);

    // A edits at rev 150 and syncs.
    put_local(&a, item(100, 150, "hello world"));
    let stats = a.sync_now().await.unwrap();
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.checkpoint, 150);

    // B edited at rev 140 without syncing; its upload does not win.
    put_local(&b, item(100, 140, "hello there"));
    let stats = b.sync_now().await.unwrap();
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.adopted, 1);
    assert_eq!(b.note(100).unwrap(), Some(item(100, 150, "hello world")));
    assert_eq!(stored(&b, 100), Some(item(100, 150, "hello world")));

    // A never regresses to B's older revision.
    a.sync_now().await.unwrap();
    assert_eq!(a.note(100).unwrap(), Some(item(100, 150, "hello world")));
}

#[tokio::test]
async fn test_notes_flow_through_writer_and_sync() {
    let url = start_server().await;
    let dir = TempDir::new().unwrap();
    let a = device(&url, &dir, "a", "pw").await;
    let b = device(&url, &dir, "b", "pw").await;

    let note = a.create_note().unwrap();
    a.edit_note(note.id, "Groceries: milk").await.unwrap();
    a.edit_note(note.id, "Groceries: milk, eggs").await.unwrap();
    a.flush().await.unwrap();
    assert_eq!(
        stored(&a, note.id).map(|i| i.data),
        Some("Groceries: milk, eggs".to_string())
    );

    a.sync_now().await.unwrap();
    b.sync_now().await.unwrap();

    let found = b.search("EGGS").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, note.id);

    a.shutdown().await.unwrap();
    b.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_new_device_catches_up_across_chunks_in_one_cycle() {
    let url = start_server_with_capacity(2).await;
    let dir = TempDir::new().unwrap();
    let a = device(&url, &dir, "a", "pw").await;

    // Three uploads of two items each fill three chunks.
    for batch in 0..3 {
        let first = batch * 2 + 1;
        put_local(&a, item(first, first * 10, "x"));
        put_local(&a, item(first + 1, (first + 1) * 10, "y"));
        a.sync_now().await.unwrap();
    }
    assert_eq!(a.context().settings().unwrap().last_sync, 60);

    let b = device(&url, &dir, "b", "pw").await;
    let stats = b.sync_now().await.unwrap();
    assert_eq!(stats.uploaded, 0);
    assert_eq!(stats.downloaded, 6);
    assert_eq!(stats.adopted, 6);
    assert_eq!(stats.checkpoint, 60);
    for id in 1..=6 {
        assert!(b.note(id).unwrap().is_some(), "note {id} missing");
    }
}

#[tokio::test]
async fn test_wrong_password_rejected_by_server() {
    let url = start_server().await;
    let dir = TempDir::new().unwrap();
    let a = device(&url, &dir, "a", "right").await;
    a.sync_now().await.unwrap();

    // A fresh device has no local verifier, so only the server can tell.
    let intruder = device(&url, &dir, "intruder", "wrong").await;
    assert!(matches!(
        intruder.sync_now().await,
        Err(ClientError::Status(401))
    ));
    assert_eq!(intruder.context().settings().unwrap().last_sync, 0);
}

#[tokio::test]
async fn test_device_reopens_with_synced_state() {
    let url = start_server().await;
    let dir = TempDir::new().unwrap();

    let a = device(&url, &dir, "a", "pw").await;
    put_local(&a, item(7, 7, "persisted"));
    a.sync_now().await.unwrap();
    a.shutdown().await.unwrap();

    let config = ClientConfig {
        server_url: url.clone(),
        locked_poll: Duration::from_secs(3600),
        db_path: Some(dir.path().join("a.db")),
        ..ClientConfig::default()
    };
    let reopened = Client::open(config).unwrap();
    assert_eq!(reopened.phase(), Phase::Locked);
    assert!(matches!(
        reopened.unlock(Zeroizing::new("nope".into())).await,
        Err(ClientError::WrongPassword)
    ));

    reopened.unlock(Zeroizing::new("pw".into())).await.unwrap();
    assert_eq!(reopened.note(7).unwrap(), Some(item(7, 7, "persisted")));
    assert_eq!(reopened.context().settings().unwrap().last_sync, 7);
}
