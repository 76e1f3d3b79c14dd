//! 聊天对象模块
//!
//! 好友、群聊和群成员共用的实体、原始数据和集合

pub mod collection;
pub mod models;
pub mod service;

pub use collection::{match_attributes, match_name, AsChat, Chats, Keywords};
pub use models::ChatPayload;
pub use service::Chat;
