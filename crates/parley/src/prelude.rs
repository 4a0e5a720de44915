//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust
//! use parley::prelude::*;
//! ```

pub use crate::{
    History,
    Message, Content, Role,
    Conversation, DBMessage, Attachment, MessageAttachment,
    ConversationStore, MessageStore, AttachmentStore, MessageAttachmentStore,
    Provider, ProviderConfig, BackendKind, PersistError,
    create_provider,
};
