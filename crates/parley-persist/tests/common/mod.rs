//! Store contract shared by every backend.
//!
//! Each backend test file builds a fresh provider per test and expands
//! `contract_tests!` (via `#[macro_use] mod common;`) so all of them run the
//! same assertions. Backends that need an external server expand
//! `contract_tests!(#[ignore = "..."] setup)` instead.

#![allow(dead_code)]

use std::sync::Arc;

use parley_persist::{
    Attachment, Conversation, DBMessage, MessageAttachment, PersistError, Provider,
};
use parley_types::Role;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::MutexGuard;

/// Provider plus whatever must outlive it (a temp dir for file databases,
/// the lock on a shared server)
pub struct Harness {
    pub provider: Arc<dyn Provider>,
    _dir: Option<TempDir>,
    _lock: Option<MutexGuard<'static, ()>>,
}

impl Harness {
    pub fn new(provider: Arc<dyn Provider>, dir: Option<TempDir>) -> Self {
        Self {
            provider,
            _dir: dir,
            _lock: None,
        }
    }

    /// Harness holding `lock` until the test finishes
    pub fn exclusive(provider: Arc<dyn Provider>, lock: MutexGuard<'static, ()>) -> Self {
        Self {
            provider,
            _dir: None,
            _lock: Some(lock),
        }
    }
}

macro_rules! contract_tests {
    (@each [] $setup:path; $($name:ident),+ $(,)?) => {
        $(
            #[tokio::test]
            async fn $name() {
                let harness = $setup().await;
                common::$name(harness.provider.as_ref()).await;
                harness.provider.close().await.unwrap();
            }
        )+
    };
    (@each [$reason:literal] $setup:path; $($name:ident),+ $(,)?) => {
        $(
            #[tokio::test]
            #[ignore = $reason]
            async fn $name() {
                let harness = $setup().await;
                common::$name(harness.provider.as_ref()).await;
                harness.provider.close().await.unwrap();
            }
        )+
    };
    (@list $mode:tt $setup:path) => {
        contract_tests!(@each $mode $setup;
            messages_are_listed_by_order_seq,
            order_seq_is_assigned_when_unset,
            message_round_trip,
            first_or_create_is_idempotent,
            archive_and_pin_are_independent,
            conversations_are_listed_by_recent_activity,
            conversation_update_refreshes_updated_at,
            conversation_delete_removes_messages,
            message_update_and_targeted_mutators,
            message_cannot_change_conversation,
            attachments_are_listed_through_links,
            attachment_update_and_delete,
            bulk_association_deletes,
            missing_ids_are_not_found,
            duplicate_ids_conflict,
            zero_limit_returns_empty_page,
            huge_offset_returns_empty_page,
            duplicate_order_seq_conflicts,
            explicit_association_ids_do_not_collide,
        );
    };
    (#[ignore = $reason:literal] $setup:path) => {
        contract_tests!(@list [$reason] $setup);
    };
    ($setup:path) => {
        contract_tests!(@list [] $setup);
    };
}

pub async fn conversation(p: &dyn Provider, conv_id: &str, updated_at: i64) -> Conversation {
    let mut conversation = Conversation::new(conv_id).with_title(format!("title of {conv_id}"));
    conversation.created_at = updated_at;
    conversation.updated_at = updated_at;
    p.conversations().create(conversation).await.unwrap()
}

pub async fn message(p: &dyn Provider, conv_id: &str, order_seq: i64, content: &str) -> DBMessage {
    let msg = DBMessage::new(conv_id, Role::User, content).with_order_seq(order_seq);
    p.messages().create(msg).await.unwrap()
}

pub async fn attachment(p: &dyn Provider, file_name: &str) -> Attachment {
    let attachment = Attachment {
        attachment_type: "file".into(),
        file_name: file_name.into(),
        file_size: 1024,
        storage_type: "local".into(),
        storage_path: format!("/uploads/{file_name}"),
        mime_type: "text/plain".into(),
        ..Default::default()
    };
    p.attachments().create(attachment).await.unwrap()
}

fn contents(messages: &[DBMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.content.as_str()).collect()
}

pub async fn messages_are_listed_by_order_seq(p: &dyn Provider) {
    conversation(p, "c1", 100).await;
    message(p, "c1", 30, "third").await;
    message(p, "c1", 10, "first").await;
    message(p, "c1", 20, "second").await;
    message(p, "other", 15, "elsewhere").await;

    let listed = p.messages().list_by_conversation("c1", 0, 10).await.unwrap();
    assert_eq!(contents(&listed), vec!["first", "second", "third"]);

    let page = p.messages().list_by_conversation("c1", 1, 1).await.unwrap();
    assert_eq!(contents(&page), vec!["second"]);

    let past_end = p.messages().list_by_conversation("c1", 5, 10).await.unwrap();
    assert!(past_end.is_empty());
}

pub async fn order_seq_is_assigned_when_unset(p: &dyn Provider) {
    let a = message(p, "c1", 0, "a").await;
    let b = message(p, "c1", 0, "b").await;
    let c = message(p, "c1", 0, "c").await;
    assert_eq!((a.order_seq, b.order_seq, c.order_seq), (1, 2, 3));

    let explicit = message(p, "c1", 10, "d").await;
    assert_eq!(explicit.order_seq, 10);
    assert_eq!(message(p, "c1", 0, "e").await.order_seq, 11);

    let listed = p.messages().list_by_conversation("c1", 0, 100).await.unwrap();
    assert_eq!(contents(&listed), vec!["a", "b", "c", "d", "e"]);
}

pub async fn message_round_trip(p: &dyn Provider) {
    let created = p
        .messages()
        .create(DBMessage::new("c1", Role::Assistant, "hello"))
        .await
        .unwrap();
    assert!(!created.msg_id.is_empty());
    assert!(created.created_at > 0);

    let fetched = p.messages().get_by_id(&created.msg_id).await.unwrap();
    assert_eq!(fetched.content, "hello");
    assert_eq!(fetched.role, Role::Assistant);
    assert_eq!(fetched.conversation_id, "c1");
    assert_eq!(fetched, created);
}

pub async fn first_or_create_is_idempotent(p: &dyn Provider) {
    let first = p.conversations().first_or_create("fresh").await.unwrap();
    let second = p.conversations().first_or_create("fresh").await.unwrap();
    assert_eq!(first.conv_id, "fresh");
    assert_eq!(first, second);
    assert!(!first.is_archived && !first.is_pinned);

    let listed = p.conversations().list(0, 10).await.unwrap();
    assert_eq!(listed.iter().filter(|c| c.conv_id == "fresh").count(), 1);

    // an existing conversation is returned untouched
    conversation(p, "named", 50).await;
    let existing = p.conversations().first_or_create("named").await.unwrap();
    assert_eq!(existing.title, "title of named");
    assert_eq!(existing.updated_at, 50);

    let err = p.conversations().first_or_create("").await.unwrap_err();
    assert!(matches!(err, PersistError::InvalidArgument(_)));
}

pub async fn archive_and_pin_are_independent(p: &dyn Provider) {
    let store = p.conversations();
    conversation(p, "c1", 100).await;

    let flags = |c: Conversation| (c.is_archived, c.is_pinned);

    store.archive("c1").await.unwrap();
    assert_eq!(flags(store.get_by_id("c1").await.unwrap()), (true, false));

    store.pin("c1").await.unwrap();
    assert_eq!(flags(store.get_by_id("c1").await.unwrap()), (true, true));

    store.unarchive("c1").await.unwrap();
    assert_eq!(flags(store.get_by_id("c1").await.unwrap()), (false, true));

    store.unpin("c1").await.unwrap();
    assert_eq!(flags(store.get_by_id("c1").await.unwrap()), (false, false));

    // toggles count as activity
    assert!(store.get_by_id("c1").await.unwrap().updated_at > 100);
}

pub async fn conversations_are_listed_by_recent_activity(p: &dyn Provider) {
    conversation(p, "oldest", 100).await;
    conversation(p, "middle", 200).await;
    conversation(p, "newest", 300).await;

    let ids = |list: Vec<Conversation>| list.into_iter().map(|c| c.conv_id).collect::<Vec<_>>();

    let listed = p.conversations().list(0, 10).await.unwrap();
    assert_eq!(ids(listed), vec!["newest", "middle", "oldest"]);

    let page = p.conversations().list(1, 1).await.unwrap();
    assert_eq!(ids(page), vec!["middle"]);

    // appending a message moves the conversation to the top
    message(p, "oldest", 0, "bump").await;
    let listed = p.conversations().list(0, 10).await.unwrap();
    assert_eq!(ids(listed), vec!["oldest", "newest", "middle"]);
}

pub async fn conversation_update_refreshes_updated_at(p: &dyn Provider) {
    let created = conversation(p, "c1", 10).await;

    let mut changed = created.clone();
    changed.title = "renamed".into();
    changed.settings = Some(json!({"model": "m-large", "temperature": 0.2}));
    let updated = p.conversations().update(changed).await.unwrap();

    assert_eq!(updated.title, "renamed");
    assert_eq!(updated.created_at, 10);
    assert!(updated.updated_at > 10);

    let fetched = p.conversations().get_by_id("c1").await.unwrap();
    assert_eq!(fetched, updated);
    assert_eq!(fetched.settings, Some(json!({"model": "m-large", "temperature": 0.2})));
}

pub async fn conversation_delete_removes_messages(p: &dyn Provider) {
    conversation(p, "doomed", 100).await;
    conversation(p, "kept", 100).await;
    let m1 = message(p, "doomed", 0, "one").await;
    let m2 = message(p, "doomed", 0, "two").await;
    let survivor = message(p, "kept", 0, "stays").await;

    p.conversations().delete("doomed").await.unwrap();

    assert!(p.conversations().get_by_id("doomed").await.unwrap_err().is_not_found());
    assert!(p.messages().get_by_id(&m1.msg_id).await.unwrap_err().is_not_found());
    assert!(p.messages().get_by_id(&m2.msg_id).await.unwrap_err().is_not_found());
    assert!(p
        .messages()
        .list_by_conversation("doomed", 0, 10)
        .await
        .unwrap()
        .is_empty());

    assert!(p.messages().get_by_id(&survivor.msg_id).await.is_ok());
    let remaining = p.conversations().list(0, 10).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].conv_id, "kept");
}

pub async fn message_update_and_targeted_mutators(p: &dyn Provider) {
    let store = p.messages();
    let mut msg = message(p, "c1", 0, "draft").await;

    msg.content = "final".into();
    msg.status = "complete".into();
    store.update(&msg).await.unwrap();
    let fetched = store.get_by_id(&msg.msg_id).await.unwrap();
    assert_eq!(fetched.content, "final");
    assert_eq!(fetched.status, "complete");

    store.update_status(&msg.msg_id, "archived").await.unwrap();
    store.update_token_count(&msg.msg_id, 42).await.unwrap();
    store.set_context_edge(&msg.msg_id, true).await.unwrap();
    store.set_variant(&msg.msg_id, true).await.unwrap();

    let fetched = store.get_by_id(&msg.msg_id).await.unwrap();
    assert_eq!(fetched.status, "archived");
    assert_eq!(fetched.token_count, 42);
    assert!(fetched.is_context_edge);
    assert!(fetched.is_variant);
    assert_eq!(fetched.content, "final");

    store.set_variant(&msg.msg_id, false).await.unwrap();
    assert!(!store.get_by_id(&msg.msg_id).await.unwrap().is_variant);
}

pub async fn message_cannot_change_conversation(p: &dyn Provider) {
    let mut msg = message(p, "c1", 0, "pinned here").await;
    msg.conversation_id = "c2".into();

    let err = p.messages().update(&msg).await.unwrap_err();
    assert!(matches!(err, PersistError::InvalidArgument(_)));
    assert_eq!(p.messages().get_by_id(&msg.msg_id).await.unwrap().conversation_id, "c1");

    let err = p
        .messages()
        .create(DBMessage::new("", Role::User, "orphan"))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::InvalidArgument(_)));
}

pub async fn attachments_are_listed_through_links(p: &dyn Provider) {
    let msg = message(p, "c1", 0, "see attached").await;
    let other = message(p, "c1", 0, "unrelated").await;
    let a1 = attachment(p, "a.txt").await;
    let a2 = attachment(p, "b.txt").await;
    let a3 = attachment(p, "c.txt").await;

    let links = p.message_attachments();
    let l1 = links.create(MessageAttachment::new(&msg.msg_id, &a1.attach_id)).await.unwrap();
    let l2 = links.create(MessageAttachment::new(&msg.msg_id, &a2.attach_id)).await.unwrap();
    links.create(MessageAttachment::new(&other.msg_id, &a3.attach_id)).await.unwrap();
    assert!(l1.id > 0 && l2.id > 0 && l1.id != l2.id);

    let mut names: Vec<String> = p
        .attachments()
        .list_by_message(&msg.msg_id)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.file_name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.txt", "b.txt"]);

    let by_message = links.list_by_message(&msg.msg_id).await.unwrap();
    assert_eq!(by_message.len(), 2);
    let by_attachment = links.list_by_attachment(&a1.attach_id).await.unwrap();
    assert_eq!(by_attachment, vec![l1.clone()]);

    links.delete(l1.id).await.unwrap();
    let remaining = p.attachments().list_by_message(&msg.msg_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].attach_id, a2.attach_id);
    assert!(links.list_by_attachment(&a1.attach_id).await.unwrap().is_empty());

    assert!(p
        .attachments()
        .list_by_message("no-such-message")
        .await
        .unwrap()
        .is_empty());
}

pub async fn attachment_update_and_delete(p: &dyn Provider) {
    let msg = message(p, "c1", 0, "with file").await;
    let mut a1 = attachment(p, "report.pdf").await;
    let a2 = attachment(p, "photo.png").await;
    for a in [&a1, &a2] {
        p.message_attachments()
            .create(MessageAttachment::new(&msg.msg_id, &a.attach_id))
            .await
            .unwrap();
    }

    a1.mime_type = "application/pdf".into();
    a1.file_size = 2048;
    p.attachments().update(&a1).await.unwrap();
    assert_eq!(p.attachments().get_by_id(&a1.attach_id).await.unwrap(), a1);

    p.attachments().delete(&a2.attach_id).await.unwrap();
    assert!(p.attachments().get_by_id(&a2.attach_id).await.unwrap_err().is_not_found());

    // a deleted attachment never shows up through its message
    let listed = p.attachments().list_by_message(&msg.msg_id).await.unwrap();
    assert_eq!(listed, vec![a1]);
}

pub async fn bulk_association_deletes(p: &dyn Provider) {
    let links = p.message_attachments();
    let (m1, m2) = (message(p, "c1", 0, "m1").await, message(p, "c1", 0, "m2").await);
    let (a1, a2) = (attachment(p, "a1").await, attachment(p, "a2").await);

    for (m, a) in [(&m1, &a1), (&m1, &a2), (&m2, &a1), (&m2, &a2)] {
        links.create(MessageAttachment::new(&m.msg_id, &a.attach_id)).await.unwrap();
    }

    let removed = links
        .delete_by_message_and_attachment(&m1.msg_id, &a1.attach_id)
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(links.list_by_message(&m1.msg_id).await.unwrap().len(), 1);

    assert_eq!(links.delete_by_attachment(&a2.attach_id).await.unwrap(), 2);
    assert!(links.list_by_message(&m1.msg_id).await.unwrap().is_empty());

    assert_eq!(links.delete_by_message(&m2.msg_id).await.unwrap(), 1);
    assert_eq!(links.delete_by_message(&m2.msg_id).await.unwrap(), 0);
    assert!(links.list_by_attachment(&a1.attach_id).await.unwrap().is_empty());
}

pub async fn missing_ids_are_not_found(p: &dyn Provider) {
    assert!(p.conversations().get_by_id("nope").await.unwrap_err().is_not_found());
    assert!(p.conversations().delete("nope").await.unwrap_err().is_not_found());
    assert!(p.conversations().archive("nope").await.unwrap_err().is_not_found());
    assert!(p.conversations().unpin("nope").await.unwrap_err().is_not_found());
    assert!(p
        .conversations()
        .update(Conversation::new("nope"))
        .await
        .unwrap_err()
        .is_not_found());

    assert!(p.messages().get_by_id("nope").await.unwrap_err().is_not_found());
    assert!(p.messages().delete("nope").await.unwrap_err().is_not_found());
    assert!(p.messages().update_status("nope", "x").await.unwrap_err().is_not_found());
    assert!(p.messages().set_variant("nope", true).await.unwrap_err().is_not_found());
    let mut ghost = DBMessage::new("c1", Role::User, "ghost");
    ghost.msg_id = "nope".into();
    assert!(p.messages().update(&ghost).await.unwrap_err().is_not_found());

    assert!(p.attachments().get_by_id("nope").await.unwrap_err().is_not_found());
    assert!(p.attachments().delete("nope").await.unwrap_err().is_not_found());
    let ghost = Attachment {
        attach_id: "nope".into(),
        ..Default::default()
    };
    assert!(p.attachments().update(&ghost).await.unwrap_err().is_not_found());

    assert!(p.message_attachments().delete(999_999).await.unwrap_err().is_not_found());
}

pub async fn duplicate_ids_conflict(p: &dyn Provider) {
    conversation(p, "twice", 100).await;
    let err = p
        .conversations()
        .create(Conversation::new("twice"))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::Conflict(_)), "{err}");

    let msg = message(p, "twice", 0, "once").await;
    let mut copy = DBMessage::new("twice", Role::User, "again");
    copy.msg_id = msg.msg_id.clone();
    let err = p.messages().create(copy).await.unwrap_err();
    assert!(matches!(err, PersistError::Conflict(_)), "{err}");

    // the original survives
    assert_eq!(p.messages().get_by_id(&msg.msg_id).await.unwrap().content, "once");
}

pub async fn zero_limit_returns_empty_page(p: &dyn Provider) {
    conversation(p, "c1", 100).await;
    message(p, "c1", 0, "hello").await;

    assert!(p.conversations().list(0, 0).await.unwrap().is_empty());
    assert!(p
        .messages()
        .list_by_conversation("c1", 0, 0)
        .await
        .unwrap()
        .is_empty());
}

pub async fn huge_offset_returns_empty_page(p: &dyn Provider) {
    conversation(p, "c1", 100).await;
    message(p, "c1", 0, "hello").await;

    assert!(p.conversations().list(usize::MAX, 10).await.unwrap().is_empty());
    assert!(p
        .messages()
        .list_by_conversation("c1", usize::MAX, 10)
        .await
        .unwrap()
        .is_empty());

    // an unbounded limit still returns everything
    assert_eq!(p.conversations().list(0, usize::MAX).await.unwrap().len(), 1);
    let all = p.messages().list_by_conversation("c1", 0, usize::MAX).await.unwrap();
    assert_eq!(contents(&all), vec!["hello"]);
}

pub async fn duplicate_order_seq_conflicts(p: &dyn Provider) {
    conversation(p, "c1", 100).await;
    message(p, "c1", 5, "first").await;

    let err = p
        .messages()
        .create(DBMessage::new("c1", Role::User, "second").with_order_seq(5))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::Conflict(_)), "{err}");
    let listed = p.messages().list_by_conversation("c1", 0, 10).await.unwrap();
    assert_eq!(contents(&listed), vec!["first"]);

    // the same position in another conversation is free
    message(p, "c2", 5, "elsewhere").await;

    // moving onto a taken position is rejected and leaves the message in place
    let mut other = message(p, "c1", 6, "other").await;
    other.order_seq = 5;
    let err = p.messages().update(&other).await.unwrap_err();
    assert!(matches!(err, PersistError::Conflict(_)), "{err}");
    assert_eq!(p.messages().get_by_id(&other.msg_id).await.unwrap().order_seq, 6);

    // keeping its own position is not a conflict
    other.order_seq = 6;
    other.content = "edited".into();
    p.messages().update(&other).await.unwrap();
    let listed = p.messages().list_by_conversation("c1", 0, 10).await.unwrap();
    assert_eq!(contents(&listed), vec!["first", "edited"]);
}

pub async fn explicit_association_ids_do_not_collide(p: &dyn Provider) {
    let links = p.message_attachments();
    let mut explicit = MessageAttachment::new("m1", "a1");
    explicit.id = 2;
    let explicit = links.create(explicit).await.unwrap();
    assert_eq!(explicit.id, 2);

    let first = links.create(MessageAttachment::new("m1", "a2")).await.unwrap();
    let second = links.create(MessageAttachment::new("m1", "a3")).await.unwrap();

    let mut ids = vec![explicit.id, first.id, second.id];
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3, "{ids:?}");

    let listed = links.list_by_message("m1").await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.contains(&explicit) && listed.contains(&first) && listed.contains(&second));

    // an explicit id that is already taken still conflicts
    let mut taken = MessageAttachment::new("m2", "a4");
    taken.id = first.id;
    let err = links.create(taken).await.unwrap_err();
    assert!(matches!(err, PersistError::Conflict(_)), "{err}");
}
