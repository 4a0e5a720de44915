#![cfg(feature = "sql")]
//! Relational backend against SQLite files in temp directories

#[macro_use]
mod common;

use std::sync::Arc;

use futures::future::join_all;
use parley_persist::{
    create_provider, BackendKind, MessageAttachment, PersistError, PoolConfig, Provider, ProviderConfig,
    SqlProvider,
};

use common::Harness;

fn sqlite_config(dir: &tempfile::TempDir) -> ProviderConfig {
    let path = dir.path().join("parley.db");
    ProviderConfig::new(format!("sqlite://{}?mode=rwc", path.display()), "sqlite")
        .with_debug(true)
        .with_log_level("debug")
        .with_pool(PoolConfig {
            max_connections: 4,
            min_connections: 1,
            ..PoolConfig::default()
        })
}

async fn setup() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let provider = create_provider(&sqlite_config(&dir)).await.unwrap();
    assert_eq!(provider.backend(), BackendKind::Relational);
    Harness::new(provider, Some(dir))
}

contract_tests!(setup);

#[tokio::test]
async fn test_schema_creation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir);

    let first = SqlProvider::connect(&config).await.unwrap();
    common::conversation(&first, "kept", 100).await;
    first.close().await.unwrap();

    // reopening runs the DDL again without touching existing rows
    let second = create_provider(&config).await.unwrap();
    let conversation = second.conversations().get_by_id("kept").await.unwrap();
    assert_eq!(conversation.updated_at, 100);
    second.close().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_first_or_create_yields_one_row() {
    let harness = setup().await;
    let store = harness.provider.conversations();

    let calls = (0..8).map(|_| {
        let store = Arc::clone(&store);
        async move { store.first_or_create("contended").await }
    });
    let results = join_all(calls).await;

    let created: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
    assert!(created.windows(2).all(|pair| pair[0] == pair[1]));

    let listed = store.list(0, 100).await.unwrap();
    assert_eq!(listed.iter().filter(|c| c.conv_id == "contended").count(), 1);
    harness.provider.close().await.unwrap();
}

#[tokio::test]
async fn test_delete_message_removes_its_links() {
    let harness = setup().await;
    let p = harness.provider.as_ref();

    let msg = common::message(p, "c1", 0, "with attachment").await;
    let attachment = common::attachment(p, "notes.txt").await;
    p.message_attachments()
        .create(MessageAttachment::new(&msg.msg_id, &attachment.attach_id))
        .await
        .unwrap();

    p.messages().delete(&msg.msg_id).await.unwrap();
    assert!(p
        .message_attachments()
        .list_by_attachment(&attachment.attach_id)
        .await
        .unwrap()
        .is_empty());
    harness.provider.close().await.unwrap();
}

#[tokio::test]
async fn test_auto_association_ids_match_stored_rows() {
    let harness = setup().await;
    let links = harness.provider.message_attachments();

    let first = links.create(MessageAttachment::new("m1", "a1")).await.unwrap();
    let second = links.create(MessageAttachment::new("m1", "a2")).await.unwrap();
    assert_eq!((first.id, second.id), (1, 2));

    // exactly one row per create, carrying the returned id
    assert_eq!(links.list_by_message("m1").await.unwrap(), vec![first.clone(), second]);
    links.delete(first.id).await.unwrap();
    assert_eq!(links.list_by_message("m1").await.unwrap().len(), 1);
    harness.provider.close().await.unwrap();
}

#[tokio::test]
async fn test_unknown_scheme_is_rejected() {
    let config = ProviderConfig::new("postgres://localhost/parley", "relational");
    let err = create_provider(&config).await.err().unwrap();
    assert!(matches!(err, PersistError::InvalidArgument(_)));
}
