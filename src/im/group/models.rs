//! 群成员

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Weak;

use crate::im::chat::{AsChat, Chat, ChatPayload};
use crate::im::session::Session;
use crate::im::utils::UserNameRef;

/// 群成员，记录所属群聊的 UserName
#[derive(Clone)]
pub struct Member {
    chat: Chat,
    group_user_name: String,
}

impl Member {
    pub fn new(payload: ChatPayload, group_user_name: &str, session: Weak<Session>) -> Self {
        Self {
            chat: Chat::new(payload, session),
            group_user_name: group_user_name.to_string(),
        }
    }

    /// 所属群聊的 UserName
    pub fn group_user_name(&self) -> &str {
        &self.group_user_name
    }

    pub fn chat(&self) -> &Chat {
        &self.chat
    }
}

impl Deref for Member {
    type Target = Chat;

    fn deref(&self) -> &Chat {
        &self.chat
    }
}

impl AsChat for Member {
    fn as_chat(&self) -> &Chat {
        &self.chat
    }
}

impl UserNameRef for Member {
    fn user_name_ref(&self) -> Option<&str> {
        Some(self.chat.user_name())
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Member: {}>",
            self.chat.name().unwrap_or(self.chat.user_name())
        )
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("user_name", &self.chat.user_name())
            .field("name", &self.chat.name())
            .field("group", &self.group_user_name)
            .finish()
    }
}

// 与 Chat 共用同一个哈希标签：成员和同一 UserName 的聊天对象相等
impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.chat == other.chat
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chat.hash(state);
    }
}

impl PartialEq<Chat> for Member {
    fn eq(&self, other: &Chat) -> bool {
        self.chat == *other
    }
}

impl PartialEq<Member> for Chat {
    fn eq(&self, other: &Member) -> bool {
        *self == other.chat
    }
}
