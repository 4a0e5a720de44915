//! Chat-turn representation exchanged between Parley and the code driving a
//! conversation (an agent loop, a chat UI, a model client).

pub mod content;
pub mod message;
pub mod role;

pub use content::{Content, ContentPart};
pub use message::Message;
pub use role::{ParseRoleError, Role};
