use serde::{Deserialize, Serialize};

/// Database-agnostic conversation model
///
/// `conv_id` is immutable once assigned. `updated_at` is the global sort key
/// for listings and is refreshed by every mutation and every appended message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Conversation {
    pub conv_id: String,
    #[serde(default)]
    pub title: String,
    /// Opaque caller metadata, never interpreted by the stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_pinned: bool,
}

impl Conversation {
    pub fn new(conv_id: impl Into<String>) -> Self {
        Self {
            conv_id: conv_id.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Fill in the id and timestamps a caller left unset
    pub(crate) fn prepare_for_insert(&mut self, now: i64) {
        if self.conv_id.is_empty() {
            self.conv_id = uuid::Uuid::new_v4().to_string();
        }
        if self.created_at == 0 {
            self.created_at = now;
        }
        if self.updated_at == 0 {
            self.updated_at = now;
        }
    }
}
