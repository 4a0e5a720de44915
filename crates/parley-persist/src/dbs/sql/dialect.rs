use crate::error::{PersistError, Result};

/// SQL flavour behind an `AnyPool`
///
/// Queries are written once with `?` placeholders; only DDL and the
/// "insert unless the unique key exists" syntax differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Ok(Self::MySql)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            Err(PersistError::InvalidArgument(format!(
                "unrecognized relational connection string: {}",
                redact(url)
            )))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// `INSERT` prefix that silently skips rows violating a unique key
    pub fn insert_ignore(&self) -> &'static str {
        match self {
            Self::MySql => "INSERT IGNORE INTO",
            Self::Sqlite => "INSERT OR IGNORE INTO",
        }
    }

    /// Idempotent, additive-only schema statements, in execution order
    pub fn schema(&self) -> Vec<&'static str> {
        match self {
            Self::MySql => vec![
                r#"CREATE TABLE IF NOT EXISTS conversations (
                    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    conv_id VARCHAR(191) NOT NULL,
                    title VARCHAR(255) NOT NULL DEFAULT '',
                    settings TEXT NULL,
                    created_at BIGINT NOT NULL DEFAULT 0,
                    updated_at BIGINT NOT NULL DEFAULT 0,
                    is_archived BIGINT NOT NULL DEFAULT 0,
                    is_pinned BIGINT NOT NULL DEFAULT 0,
                    UNIQUE KEY uk_conversations_conv_id (conv_id),
                    KEY idx_conversations_updated_at (updated_at)
                ) DEFAULT CHARSET = utf8mb4"#,
                r#"CREATE TABLE IF NOT EXISTS messages (
                    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    msg_id VARCHAR(191) NOT NULL,
                    conversation_id VARCHAR(191) NOT NULL,
                    role VARCHAR(32) NOT NULL,
                    content LONGTEXT NOT NULL,
                    order_seq BIGINT NOT NULL DEFAULT 0,
                    status VARCHAR(64) NOT NULL DEFAULT '',
                    token_count BIGINT NOT NULL DEFAULT 0,
                    is_context_edge BIGINT NOT NULL DEFAULT 0,
                    is_variant BIGINT NOT NULL DEFAULT 0,
                    created_at BIGINT NOT NULL DEFAULT 0,
                    UNIQUE KEY uk_messages_msg_id (msg_id),
                    UNIQUE KEY uk_messages_conversation_order (conversation_id, order_seq)
                ) DEFAULT CHARSET = utf8mb4"#,
                r#"CREATE TABLE IF NOT EXISTS attachments (
                    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    attach_id VARCHAR(191) NOT NULL,
                    attachment_type VARCHAR(64) NOT NULL DEFAULT '',
                    file_name VARCHAR(255) NOT NULL DEFAULT '',
                    file_size BIGINT NOT NULL DEFAULT 0,
                    storage_type VARCHAR(64) NOT NULL DEFAULT '',
                    storage_path VARCHAR(1024) NOT NULL DEFAULT '',
                    mime_type VARCHAR(255) NOT NULL DEFAULT '',
                    created_at BIGINT NOT NULL DEFAULT 0,
                    UNIQUE KEY uk_attachments_attach_id (attach_id)
                ) DEFAULT CHARSET = utf8mb4"#,
                r#"CREATE TABLE IF NOT EXISTS message_attachments (
                    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    message_id VARCHAR(191) NOT NULL,
                    attachment_id VARCHAR(191) NOT NULL,
                    KEY idx_message_attachments_message (message_id),
                    KEY idx_message_attachments_attachment (attachment_id)
                ) DEFAULT CHARSET = utf8mb4"#,
            ],
            Self::Sqlite => vec![
                r#"CREATE TABLE IF NOT EXISTS conversations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    conv_id TEXT NOT NULL UNIQUE,
                    title TEXT NOT NULL DEFAULT '',
                    settings TEXT NULL,
                    created_at INTEGER NOT NULL DEFAULT 0,
                    updated_at INTEGER NOT NULL DEFAULT 0,
                    is_archived INTEGER NOT NULL DEFAULT 0,
                    is_pinned INTEGER NOT NULL DEFAULT 0
                )"#,
                "CREATE INDEX IF NOT EXISTS idx_conversations_updated_at ON conversations (updated_at)",
                r#"CREATE TABLE IF NOT EXISTS messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    msg_id TEXT NOT NULL UNIQUE,
                    conversation_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    order_seq INTEGER NOT NULL DEFAULT 0,
                    status TEXT NOT NULL DEFAULT '',
                    token_count INTEGER NOT NULL DEFAULT 0,
                    is_context_edge INTEGER NOT NULL DEFAULT 0,
                    is_variant INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL DEFAULT 0
                )"#,
                "CREATE UNIQUE INDEX IF NOT EXISTS uk_messages_conversation_order ON messages (conversation_id, order_seq)",
                r#"CREATE TABLE IF NOT EXISTS attachments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    attach_id TEXT NOT NULL UNIQUE,
                    attachment_type TEXT NOT NULL DEFAULT '',
                    file_name TEXT NOT NULL DEFAULT '',
                    file_size INTEGER NOT NULL DEFAULT 0,
                    storage_type TEXT NOT NULL DEFAULT '',
                    storage_path TEXT NOT NULL DEFAULT '',
                    mime_type TEXT NOT NULL DEFAULT '',
                    created_at INTEGER NOT NULL DEFAULT 0
                )"#,
                r#"CREATE TABLE IF NOT EXISTS message_attachments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    message_id TEXT NOT NULL,
                    attachment_id TEXT NOT NULL
                )"#,
                "CREATE INDEX IF NOT EXISTS idx_message_attachments_message ON message_attachments (message_id)",
                "CREATE INDEX IF NOT EXISTS idx_message_attachments_attachment ON message_attachments (attachment_id)",
            ],
        }
    }
}

/// `?, ?, ?` for an `IN (...)` list of `n` values
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Strip credentials from a connection URL before it reaches a log line
pub(crate) fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
