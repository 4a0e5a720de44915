use parley_types::Role;
use sqlx::any::AnyRow;
use sqlx::Row;

use crate::error::{PersistError, Result};
use crate::models::{Attachment, Conversation, DBMessage, MessageAttachment};

pub(crate) const CONVERSATION_COLUMNS: &str =
    "conv_id, title, settings, created_at, updated_at, is_archived, is_pinned";

pub(crate) const MESSAGE_COLUMNS: &str = "msg_id, conversation_id, role, content, order_seq, status, \
     token_count, is_context_edge, is_variant, created_at";

pub(crate) const ATTACHMENT_COLUMNS: &str = "attach_id, attachment_type, file_name, file_size, \
     storage_type, storage_path, mime_type, created_at";

pub(crate) const MESSAGE_ATTACHMENT_COLUMNS: &str = "id, message_id, attachment_id";

/// Flags live in integer columns on every dialect
pub(crate) fn flag(value: bool) -> i64 {
    i64::from(value)
}

fn read_flag(row: &AnyRow, column: &str) -> Result<bool> {
    Ok(row.try_get::<i64, _>(column)? != 0)
}

/// Settings are stored as JSON text; `NULL` and empty text both mean "none"
pub(crate) fn encode_settings(settings: &Option<serde_json::Value>) -> Result<String> {
    match settings {
        Some(value) => Ok(serde_json::to_string(value)?),
        None => Ok(String::new()),
    }
}

fn decode_settings(raw: Option<String>) -> Result<Option<serde_json::Value>> {
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(text) => Ok(Some(serde_json::from_str(text)?)),
    }
}

pub(crate) fn conversation_from_row(row: &AnyRow) -> Result<Conversation> {
    Ok(Conversation {
        conv_id: row.try_get("conv_id")?,
        title: row.try_get("title")?,
        settings: decode_settings(row.try_get("settings")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        is_archived: read_flag(row, "is_archived")?,
        is_pinned: read_flag(row, "is_pinned")?,
    })
}

pub(crate) fn message_from_row(row: &AnyRow) -> Result<DBMessage> {
    let msg_id: String = row.try_get("msg_id")?;
    let role: String = row.try_get("role")?;
    let role: Role = role
        .parse()
        .map_err(|e| PersistError::Backend(format!("message {msg_id}: {e}")))?;

    Ok(DBMessage {
        conversation_id: row.try_get("conversation_id")?,
        role,
        content: row.try_get("content")?,
        order_seq: row.try_get("order_seq")?,
        status: row.try_get("status")?,
        token_count: row.try_get("token_count")?,
        is_context_edge: read_flag(row, "is_context_edge")?,
        is_variant: read_flag(row, "is_variant")?,
        created_at: row.try_get("created_at")?,
        msg_id,
    })
}

pub(crate) fn attachment_from_row(row: &AnyRow) -> Result<Attachment> {
    Ok(Attachment {
        attach_id: row.try_get("attach_id")?,
        attachment_type: row.try_get("attachment_type")?,
        file_name: row.try_get("file_name")?,
        file_size: row.try_get("file_size")?,
        storage_type: row.try_get("storage_type")?,
        storage_path: row.try_get("storage_path")?,
        mime_type: row.try_get("mime_type")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn message_attachment_from_row(row: &AnyRow) -> Result<MessageAttachment> {
    let id: i64 = row.try_get("id")?;
    Ok(MessageAttachment {
        id: u64::try_from(id).map_err(|_| PersistError::Backend(format!("negative association id {id}")))?,
        message_id: row.try_get("message_id")?,
        attachment_id: row.try_get("attachment_id")?,
    })
}
