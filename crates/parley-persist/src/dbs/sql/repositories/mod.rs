mod attachment;
mod conversation;
mod message;
mod message_attachment;

pub use attachment::SqlAttachmentStore;
pub use conversation::SqlConversationStore;
pub use message::SqlMessageStore;
pub use message_attachment::SqlMessageAttachmentStore;

pub(crate) type AnyQuery<'q> = sqlx::query::Query<'q, sqlx::Any, sqlx::any::AnyArguments<'q>>;
