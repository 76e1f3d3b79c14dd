//! 传输层接口
//!
//! 登录、轮询、上传等协议细节由外部实现，本层只依赖以下 RPC 调用。
//! 每个调用返回原始 JSON，至少带有 `BaseResponse.Ret` 状态码。

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// 消息内容前缀所表示的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    File,
    Image,
    Text,
    Video,
}

impl ContentKind {
    pub const FILE_PREFIX: &'static str = "@fil@";
    pub const IMAGE_PREFIX: &'static str = "@img@";
    pub const TEXT_PREFIX: &'static str = "@msg@";
    pub const VIDEO_PREFIX: &'static str = "@vid@";

    /// 拆分前缀和内容，没有可识别前缀时作为纯文本
    pub fn parse(content: &str) -> (Self, &str) {
        let prefixes = [
            (Self::FILE_PREFIX, Self::File),
            (Self::IMAGE_PREFIX, Self::Image),
            (Self::TEXT_PREFIX, Self::Text),
            (Self::VIDEO_PREFIX, Self::Video),
        ];
        prefixes
            .into_iter()
            .find_map(|(prefix, kind)| content.strip_prefix(prefix).map(|body| (kind, body)))
            .unwrap_or((Self::Text, content))
    }
}

/// 传输层接口（对应协议引擎暴露的 RPC）
#[async_trait]
pub trait Transport: Send + Sync {
    /// 按内容前缀分发到具体的发送接口
    async fn send(&self, msg: &str, to_user_name: &str, media_id: Option<&str>) -> Result<Value> {
        let (kind, body) = ContentKind::parse(msg);
        debug!("[Transport] 发送 {:?} 消息到 {}", kind, to_user_name);
        match kind {
            ContentKind::File => self.send_file(Path::new(body), to_user_name, media_id).await,
            ContentKind::Image => self.send_image(Path::new(body), to_user_name, media_id).await,
            ContentKind::Video => self.send_video(Path::new(body), to_user_name, media_id).await,
            ContentKind::Text => self.send_msg(body, to_user_name).await,
        }
    }

    /// 发送图片，`media_id` 不为空时跳过上传
    async fn send_image(&self, path: &Path, to_user_name: &str, media_id: Option<&str>) -> Result<Value>;

    /// 发送文件，`media_id` 不为空时跳过上传
    async fn send_file(&self, path: &Path, to_user_name: &str, media_id: Option<&str>) -> Result<Value>;

    /// 发送视频，`media_id` 不为空时跳过上传
    async fn send_video(&self, path: &Path, to_user_name: &str, media_id: Option<&str>) -> Result<Value>;

    /// 发送纯文本
    async fn send_msg(&self, msg: &str, to_user_name: &str) -> Result<Value>;

    /// 以原始格式发送其他类型的消息（如名片）
    async fn send_raw_msg(&self, msg_type: i64, content: &str, to_user_name: &str) -> Result<Value>;

    /// 置顶 / 取消置顶
    async fn set_pinned(&self, user_name: &str, is_pinned: bool) -> Result<Value>;

    /// 获取群聊详情，`detailed_member` 为 true 时包含成员的地区、性别、签名等
    async fn update_chatroom(&self, user_name: &str, detailed_member: bool) -> Result<Value>;

    async fn add_member_into_chatroom(
        &self,
        chatroom_user_name: &str,
        member_list: &[Value],
        use_invitation: bool,
    ) -> Result<Value>;

    async fn delete_member_from_chatroom(
        &self,
        chatroom_user_name: &str,
        member_list: &[Value],
    ) -> Result<Value>;

    async fn set_chatroom_name(&self, chatroom_user_name: &str, name: &str) -> Result<Value>;

    /// 好友列表，`update` 为 true 时从服务器重新拉取
    async fn get_friends(&self, update: bool) -> Result<Value>;

    /// 群聊列表，`update` 为 true 时从服务器重新拉取
    async fn get_chatrooms(&self, update: bool) -> Result<Value>;
}

/// 一次被记录的传输层调用
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: String,
    pub args: Value,
}

#[derive(Debug, Clone)]
enum Reply {
    Value(Value),
    Failure(String),
}

/// 按脚本回放的传输层
///
/// 每个操作维护一个回复队列：队列中只剩一条时重复返回该条，
/// 未配置的操作返回成功状态。所有调用都会被记录，便于离线检查和测试。
#[derive(Debug, Default)]
pub struct ReplayTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ReplayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从脚本构建，格式：`{"update_chatroom": {...}, "get_friends": [[...]]}`
    ///
    /// 操作对应的值为数组时视为按顺序返回的多条回复。
    pub fn from_script(script: Value) -> Result<Self> {
        let Value::Object(operations) = script else {
            return Err(anyhow!("回放脚本必须是 JSON 对象"));
        };
        let transport = Self::new();
        for (operation, replies) in operations {
            match replies {
                Value::Array(items) => {
                    for reply in items {
                        transport.push_reply(&operation, reply);
                    }
                }
                reply => transport.push_reply(&operation, reply),
            }
        }
        Ok(transport)
    }

    /// 追加一条回复
    pub fn push_reply(&self, operation: &str, reply: Value) {
        self.enqueue(operation, Reply::Value(reply));
    }

    /// 追加一次传输层失败
    pub fn push_failure(&self, operation: &str, message: &str) {
        self.enqueue(operation, Reply::Failure(message.to_string()));
    }

    /// 已记录的全部调用
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 某个操作被调用的次数
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    fn enqueue(&self, operation: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(operation.to_string())
            .or_default()
            .push_back(reply);
    }

    fn reply(&self, operation: &str, args: Value) -> Result<Value> {
        debug!("[Replay] {} 参数: {}", operation, args);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                operation: operation.to_string(),
                args,
            });

        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        let queued = match replies.get_mut(operation) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        match queued {
            Some(Reply::Value(value)) => Ok(value),
            Some(Reply::Failure(message)) => Err(anyhow!("{}: {}", operation, message)),
            None => Ok(json!({ "BaseResponse": { "Ret": 0, "ErrMsg": "" } })),
        }
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn send_image(&self, path: &Path, to_user_name: &str, media_id: Option<&str>) -> Result<Value> {
        self.reply(
            "send_image",
            json!({ "fileDir": path.display().to_string(), "toUserName": to_user_name, "mediaId": media_id }),
        )
    }

    async fn send_file(&self, path: &Path, to_user_name: &str, media_id: Option<&str>) -> Result<Value> {
        self.reply(
            "send_file",
            json!({ "fileDir": path.display().to_string(), "toUserName": to_user_name, "mediaId": media_id }),
        )
    }

    async fn send_video(&self, path: &Path, to_user_name: &str, media_id: Option<&str>) -> Result<Value> {
        self.reply(
            "send_video",
            json!({ "fileDir": path.display().to_string(), "toUserName": to_user_name, "mediaId": media_id }),
        )
    }

    async fn send_msg(&self, msg: &str, to_user_name: &str) -> Result<Value> {
        self.reply("send_msg", json!({ "msg": msg, "toUserName": to_user_name }))
    }

    async fn send_raw_msg(&self, msg_type: i64, content: &str, to_user_name: &str) -> Result<Value> {
        self.reply(
            "send_raw_msg",
            json!({ "msgType": msg_type, "content": content, "toUserName": to_user_name }),
        )
    }

    async fn set_pinned(&self, user_name: &str, is_pinned: bool) -> Result<Value> {
        self.reply("set_pinned", json!({ "userName": user_name, "isPinned": is_pinned }))
    }

    async fn update_chatroom(&self, user_name: &str, detailed_member: bool) -> Result<Value> {
        self.reply(
            "update_chatroom",
            json!({ "userName": user_name, "detailedMember": detailed_member }),
        )
    }

    async fn add_member_into_chatroom(
        &self,
        chatroom_user_name: &str,
        member_list: &[Value],
        use_invitation: bool,
    ) -> Result<Value> {
        self.reply(
            "add_member_into_chatroom",
            json!({
                "chatroomUserName": chatroom_user_name,
                "memberList": member_list,
                "useInvitation": use_invitation,
            }),
        )
    }

    async fn delete_member_from_chatroom(
        &self,
        chatroom_user_name: &str,
        member_list: &[Value],
    ) -> Result<Value> {
        self.reply(
            "delete_member_from_chatroom",
            json!({ "chatroomUserName": chatroom_user_name, "memberList": member_list }),
        )
    }

    async fn set_chatroom_name(&self, chatroom_user_name: &str, name: &str) -> Result<Value> {
        self.reply(
            "set_chatroom_name",
            json!({ "chatroomUserName": chatroom_user_name, "name": name }),
        )
    }

    async fn get_friends(&self, update: bool) -> Result<Value> {
        self.reply("get_friends", json!({ "update": update }))
    }

    async fn get_chatrooms(&self, update: bool) -> Result<Value> {
        self.reply("get_chatrooms", json!({ "update": update }))
    }
}
