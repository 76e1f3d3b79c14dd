//! 会话：持有传输层句柄和代表自身的聊天对象
//!
//! 实体只保存会话的弱引用，会话的生命周期由外部决定。

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::im::chat::{Chat, ChatPayload, Chats};
use crate::im::error::{Error, WxResult};
use crate::im::group::{Group, Groups, Member};
use crate::im::transport::Transport;
use crate::im::types::{handle_response, Normalized};

/// 会话配置
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// 成员列表过期自动刷新时，是否拉取成员详细信息（地区、性别、签名等）
    pub member_details: bool,
    /// `send_msg` 未给出内容时发送的默认文本
    pub greeting: String,
}

impl SessionConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self {
            member_details: false,
            greeting: "Hello WeChat!".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// 登录后的会话
pub struct Session {
    transport: Arc<dyn Transport>,
    self_chat: Chat,
    config: SessionConfig,
}

impl Session {
    /// 使用默认配置创建会话
    pub fn new(transport: Arc<dyn Transport>, self_payload: ChatPayload) -> Arc<Self> {
        Self::with_config(transport, self_payload, SessionConfig::new())
    }

    /// 使用自定义配置创建会话，`self_payload` 为当前登录账号的原始数据
    pub fn with_config(
        transport: Arc<dyn Transport>,
        self_payload: ChatPayload,
        config: SessionConfig,
    ) -> Arc<Self> {
        info!(
            "[Session] 创建会话，自身账号: {}",
            self_payload.user_name
        );
        Arc::new_cyclic(|session| Self {
            transport,
            self_chat: Chat::new(self_payload, session.clone()),
            config,
        })
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// 代表当前账号自身的聊天对象
    pub fn self_chat(&self) -> &Chat {
        &self.self_chat
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 用原始数据构建绑定到本会话的聊天对象
    pub fn chat(self: &Arc<Self>, payload: ChatPayload) -> Chat {
        Chat::new(payload, Arc::downgrade(self))
    }

    /// 用原始数据构建绑定到本会话的群聊对象
    pub fn group(self: &Arc<Self>, payload: ChatPayload) -> Group {
        Group::new(payload, Arc::downgrade(self))
    }

    /// 从 JSON 构建群聊对象
    pub fn group_from_value(self: &Arc<Self>, raw: Value) -> WxResult<Group> {
        Ok(self.group(serde_json::from_value(raw)?))
    }

    /// 获取好友列表
    pub async fn friends(self: &Arc<Self>, update: bool) -> WxResult<Chats> {
        debug!("[Session] 获取好友列表，update={}", update);
        let raw = self.transport.get_friends(update).await?;
        Ok(match handle_response::<Chat>(raw, self, "friends")? {
            Some(normalized) => normalized.into_collection(),
            None => Chats::new(),
        })
    }

    /// 获取群聊列表
    pub async fn groups(self: &Arc<Self>, update: bool) -> WxResult<Groups> {
        debug!("[Session] 获取群聊列表，update={}", update);
        let raw = self.transport.get_chatrooms(update).await?;
        Ok(match handle_response::<Group>(raw, self, "groups")? {
            Some(Normalized::Single(group)) => Groups::from(vec![group]),
            Some(Normalized::Collection(groups)) => groups,
            None => Groups::default(),
        })
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("self_chat", &self.self_chat)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// 可以解析出所属会话的调用方
pub trait SessionBound {
    fn session(&self) -> Option<Arc<Session>>;

    /// 用于错误信息的描述
    fn describe(&self) -> String;
}

impl SessionBound for Arc<Session> {
    fn session(&self) -> Option<Arc<Session>> {
        Some(Arc::clone(self))
    }

    fn describe(&self) -> String {
        format!("<Session: {}>", self.self_chat)
    }
}

impl SessionBound for Chat {
    fn session(&self) -> Option<Arc<Session>> {
        self.session_ref().upgrade()
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl SessionBound for Member {
    fn session(&self) -> Option<Arc<Session>> {
        self.chat().session()
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl SessionBound for Group {
    fn session(&self) -> Option<Arc<Session>> {
        self.chat().session()
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// 解析调用方所属的会话，找不到时返回配置错误
pub fn resolve_session(caller: &dyn SessionBound, operation: &str) -> WxResult<Arc<Session>> {
    caller.session().ok_or_else(|| {
        let entity = caller.describe();
        error!("[Session] {} 找不到所属会话: {}", operation, entity);
        Error::misconfigured(operation, entity)
    })
}
