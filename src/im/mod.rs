pub mod chat;
pub mod error;
pub mod group;
pub mod session;
pub mod transport;
pub mod types;
pub mod utils;

#[cfg(test)]
mod testing;

// 重新导出实体和集合
pub use chat::{Chat, ChatPayload, Chats, Keywords};
pub use group::{Group, Groups, Member};

// 重新导出会话、传输层与响应处理
pub use error::{Error, WxResult};
pub use session::{Session, SessionBound, SessionConfig};
pub use transport::{ContentKind, RecordedCall, ReplayTransport, Transport};
pub use types::{handle_response, FromResponse, Normalized, Reply, Response};
