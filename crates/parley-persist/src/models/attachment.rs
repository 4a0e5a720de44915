use serde::{Deserialize, Serialize};

/// Metadata for a binary payload stored elsewhere
///
/// `storage_type`/`storage_path` say where the bytes live (a filesystem path,
/// an object-store key, a URL); the payload itself is never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Attachment {
    pub attach_id: String,
    pub attachment_type: String,
    pub file_name: String,
    pub file_size: i64,
    pub storage_type: String,
    pub storage_path: String,
    pub mime_type: String,
    pub created_at: i64,
}

impl Attachment {
    pub(crate) fn prepare_for_insert(&mut self, now: i64) {
        if self.attach_id.is_empty() {
            self.attach_id = uuid::Uuid::new_v4().to_string();
        }
        if self.created_at == 0 {
            self.created_at = now;
        }
    }
}
