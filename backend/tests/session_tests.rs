use chrono::{Duration, Utc};
use gallery_portal::session::{MemorySessionStore, SessionState, SessionStore, SessionToken};
use std::sync::Arc;

#[tokio::test]
async fn test_create_and_resolve() {
    let store = MemorySessionStore::default();
    let token = store.create("alice1").await;

    assert_eq!(store.identity_of(token).await.as_deref(), Some("alice1"));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_unknown_token_is_anonymous() {
    let store = MemorySessionStore::default();
    assert!(store.identity_of(SessionToken::generate()).await.is_none());
}

#[tokio::test]
async fn test_destroy_is_idempotent() {
    let store = MemorySessionStore::default();
    let token = store.create("alice1").await;

    store.destroy(token).await;
    store.destroy(token).await;
    store.destroy(SessionToken::generate()).await;

    assert!(store.identity_of(token).await.is_none());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_tokens_are_unique_per_login() {
    let store = MemorySessionStore::default();
    let first = store.create("alice1").await;
    let second = store.create("alice1").await;
    assert_ne!(first, second);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_purge_drops_only_idle_sessions() {
    let store = MemorySessionStore::new(Duration::minutes(30));
    let token = store.create("alice1").await;

    // Still inside the window.
    assert_eq!(store.purge_idle_at(Utc::now() + Duration::minutes(29)).await, 0);
    assert_eq!(store.len().await, 1);

    assert_eq!(store.purge_idle_at(Utc::now() + Duration::minutes(31)).await, 1);
    assert!(store.identity_of(token).await.is_none());
}

#[tokio::test]
async fn test_zero_idle_window_expires_on_next_use() {
    let store = MemorySessionStore::new(Duration::zero());
    let token = store.create("alice1").await;

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    assert!(store.identity_of(token).await.is_none());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_purge_through_trait_object() {
    let store = Arc::new(MemorySessionStore::new(Duration::zero()));
    let shared: SessionState = store.clone();
    shared.create("alice1").await;
    shared.create("bob2").await;

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    assert_eq!(shared.purge_idle().await, 2);
    assert!(store.is_empty().await);
}
