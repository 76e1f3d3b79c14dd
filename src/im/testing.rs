//! 测试用的会话和数据构造

use serde_json::{json, Value};
use std::sync::{Arc, Once};

use crate::im::chat::ChatPayload;
use crate::im::session::Session;
use crate::im::transport::ReplayTransport;

static INIT_LOGGER: Once = Once::new();

/// 测试中打开当前 crate 的 debug 日志
pub(crate) fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        let filter_layer = EnvFilter::new("info,wxchat_core=debug");

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_test_writer();

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    });
}

/// 以 `@me` 为自身账号的会话
pub(crate) fn session_with(transport: Arc<ReplayTransport>) -> Arc<Session> {
    init_test_logger();
    let mut me = ChatPayload::with_user_name("@me");
    me.nick_name = Some("Me".to_string());
    Session::new(transport, me)
}

/// 成功的响应
pub(crate) fn ok() -> Value {
    json!({ "BaseResponse": { "Ret": 0, "ErrMsg": "" } })
}

/// 失败的响应
pub(crate) fn failure(code: i64, message: &str) -> Value {
    json!({ "BaseResponse": { "Ret": code, "ErrMsg": message } })
}

pub(crate) fn member(user_name: &str, nick_name: &str) -> Value {
    json!({ "UserName": user_name, "NickName": nick_name })
}

/// 带成员列表的群聊数据，同时包含成功的状态码
pub(crate) fn group_payload(user_name: &str, nick_name: &str, members: Vec<Value>) -> Value {
    json!({
        "BaseResponse": { "Ret": 0, "ErrMsg": "" },
        "UserName": user_name,
        "NickName": nick_name,
        "MemberList": members,
    })
}
