pub mod im;

// 重新导出常用类型和函数，方便外部使用
pub use im::{
    group::truncate_name,
    utils::{
        ensure_list, get_user_name, list_or_single, resolve_user_name, wrap_user_name, OneOrMany,
        UserNameRef,
    },
    Chat, ChatPayload, Chats, Error, Group, Groups, Keywords, Member, Normalized, ReplayTransport,
    Reply, Response, Session, SessionConfig, Transport, WxResult,
};
