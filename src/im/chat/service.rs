//! 聊天对象
//!
//! 好友、群聊、群成员的公共部分：身份、名称解析和发送消息。

use serde_json::{Map, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

use crate::im::chat::models::ChatPayload;
use crate::im::error::WxResult;
use crate::im::session::{resolve_session, Session};
use crate::im::types::{handle_response, Reply};
use crate::im::utils::UserNameRef;

/// 所有实体共用的哈希标签，哈希只由它和 UserName 决定
pub(crate) const ENTITY_TAG: &str = "Chat";

/// 单个聊天对象
#[derive(Clone)]
pub struct Chat {
    payload: ChatPayload,
    session: Weak<Session>,
}

impl Chat {
    pub fn new(payload: ChatPayload, session: Weak<Session>) -> Self {
        Self { payload, session }
    }

    /// 从原始 JSON 构建
    pub fn from_value(raw: Value, session: Weak<Session>) -> WxResult<Self> {
        Ok(Self::new(serde_json::from_value(raw)?, session))
    }

    pub fn payload(&self) -> &ChatPayload {
        &self.payload
    }

    /// 原始数据
    pub fn raw(&self) -> Map<String, Value> {
        self.payload.to_map()
    }

    /// 按原始键名取值
    pub fn get(&self, key: &str) -> Option<Value> {
        self.payload.get(key)
    }

    pub fn user_name(&self) -> &str {
        &self.payload.user_name
    }

    pub fn nick_name(&self) -> Option<&str> {
        self.payload.nick_name.as_deref()
    }

    pub fn remark_name(&self) -> Option<&str> {
        self.payload.remark_name.as_deref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.payload.alias.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.payload.display_name.as_deref()
    }

    /// 按 display_name、remark_name、nick_name、alias 的顺序取第一个非空的名称
    pub fn name(&self) -> Option<&str> {
        [
            self.display_name(),
            self.remark_name(),
            self.nick_name(),
            self.alias(),
        ]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
    }

    /// 按属性名取值，用于搜索时的属性过滤
    ///
    /// 未知的属性名按原始键名查找。
    pub fn attribute(&self, name: &str) -> Option<Value> {
        let text = |field: Option<&str>| field.map(Value::from);
        match name {
            "user_name" => Some(Value::from(self.user_name())),
            "nick_name" => text(self.nick_name()),
            "remark_name" => text(self.remark_name()),
            "alias" => text(self.alias()),
            "display_name" => text(self.display_name()),
            "name" => text(self.name()),
            "sex" => self.payload.sex.map(Value::from),
            "province" => text(self.payload.province.as_deref()),
            "city" => text(self.payload.city.as_deref()),
            "signature" => text(self.payload.signature.as_deref()),
            _ => self.payload.get(name),
        }
    }

    /// 所属会话，会话已释放时为 `None`
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.upgrade()
    }

    pub(crate) fn session_ref(&self) -> &Weak<Session> {
        &self.session
    }

    /// 动态发送不同类型的消息，具体类型取决于 `msg` 的前缀
    ///
    /// 前缀可为 `@fil@`、`@img@`、`@msg@`、`@vid@`，分别表示文件、图片、纯文本、视频；
    /// 省略前缀时作为纯文本发送。`media_id` 不为空时跳过上传。
    pub async fn send(&self, msg: &str, media_id: Option<&str>) -> WxResult<Reply> {
        let session = resolve_session(self, "send")?;
        let ret = session
            .transport()
            .send(msg, self.user_name(), media_id)
            .await?;
        handle_response(ret, self, "send")
    }

    /// 发送图片
    pub async fn send_image(&self, path: &Path, media_id: Option<&str>) -> WxResult<Reply> {
        let session = resolve_session(self, "send_image")?;
        let ret = session
            .transport()
            .send_image(path, self.user_name(), media_id)
            .await?;
        handle_response(ret, self, "send_image")
    }

    /// 发送文件
    pub async fn send_file(&self, path: &Path, media_id: Option<&str>) -> WxResult<Reply> {
        let session = resolve_session(self, "send_file")?;
        let ret = session
            .transport()
            .send_file(path, self.user_name(), media_id)
            .await?;
        handle_response(ret, self, "send_file")
    }

    /// 发送视频
    pub async fn send_video(&self, path: &Path, media_id: Option<&str>) -> WxResult<Reply> {
        let session = resolve_session(self, "send_video")?;
        let ret = session
            .transport()
            .send_video(path, self.user_name(), media_id)
            .await?;
        handle_response(ret, self, "send_video")
    }

    /// 发送文本消息，`msg` 为空时发送配置中的默认文本
    pub async fn send_msg(&self, msg: Option<&str>) -> WxResult<Reply> {
        let session = resolve_session(self, "send_msg")?;
        let msg = msg.unwrap_or(session.config().greeting.as_str());
        debug!("[Chat] 发送文本到 {}: {}", self, msg);
        let ret = session.transport().send_msg(msg, self.user_name()).await?;
        handle_response(ret, self, "send_msg")
    }

    /// 以原始格式发送其他类型的消息，例如转发好友名片
    pub async fn send_raw_msg(&self, msg_type: i64, content: &str) -> WxResult<Reply> {
        let session = resolve_session(self, "send_raw_msg")?;
        let ret = session
            .transport()
            .send_raw_msg(msg_type, content, self.user_name())
            .await?;
        handle_response(ret, self, "send_raw_msg")
    }

    /// 置顶
    pub async fn pin(&self) -> WxResult<Reply> {
        self.set_pinned(true).await
    }

    /// 取消置顶
    pub async fn unpin(&self) -> WxResult<Reply> {
        self.set_pinned(false).await
    }

    async fn set_pinned(&self, is_pinned: bool) -> WxResult<Reply> {
        let operation = if is_pinned { "pin" } else { "unpin" };
        let session = resolve_session(self, operation)?;
        info!("[Chat] {} {}", operation, self);
        let ret = session
            .transport()
            .set_pinned(self.user_name(), is_pinned)
            .await?;
        handle_response(ret, self, operation)
    }
}

impl fmt::Display for Chat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Chat: {}>", self.name().unwrap_or(self.user_name()))
    }
}

impl fmt::Debug for Chat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chat")
            .field("user_name", &self.user_name())
            .field("name", &self.name())
            .finish()
    }
}

impl PartialEq for Chat {
    fn eq(&self, other: &Self) -> bool {
        self.user_name() == other.user_name()
    }
}

impl Eq for Chat {}

impl Hash for Chat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ENTITY_TAG.hash(state);
        self.user_name().hash(state);
    }
}

impl UserNameRef for Chat {
    fn user_name_ref(&self) -> Option<&str> {
        Some(self.user_name())
    }
}
