//! 群聊、群成员与群聊集合

pub mod collection;
pub mod models;
pub mod rename;
pub mod service;

pub use collection::Groups;
pub use models::Member;
pub use rename::{truncate_name, NAME_BYTE_LIMIT};
pub use service::Group;
