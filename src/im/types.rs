//! 响应包装与校验
//!
//! 传输层的返回值可能是字典、字典列表或空值。[`handle_response`] 负责检查状态码，
//! 并按调用方声明的目标类型转为实体或集合。

use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::im::chat::{Chat, Chats};
use crate::im::error::{Error, WxResult};
use crate::im::group::{Group, Groups};
use crate::im::session::{resolve_session, Session, SessionBound};
use crate::im::utils::{is_truthy, list_or_single, OneOrMany};

/// 不做类型转换的操作的返回值
pub type Reply = Option<Normalized<Response>>;

/// 单条传输层返回值的包装
#[derive(Clone)]
pub struct Response {
    raw: Map<String, Value>,
    ret_code: Option<i64>,
    err_msg: Option<String>,
    session: Weak<Session>,
}

impl Response {
    /// 包装并检查 `BaseResponse.Ret`，非 0 时返回 [`Error::Response`]
    pub fn new(raw: Value, session: &Arc<Session>) -> WxResult<Self> {
        let raw: Map<String, Value> = serde_json::from_value(raw)?;
        let base_response = raw.get("BaseResponse");
        let ret_code = base_response
            .and_then(|base| base.get("Ret"))
            .and_then(Value::as_i64);
        let err_msg = base_response
            .and_then(|base| base.get("ErrMsg"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        if let Some(code) = ret_code.filter(|code| *code != 0) {
            warn!(
                "[Response] 服务器错误，错误码: {}, 错误信息: {}",
                code,
                err_msg.as_deref().unwrap_or_default()
            );
            return Err(Error::Response {
                code,
                message: err_msg,
            });
        }

        Ok(Self {
            raw,
            ret_code,
            err_msg,
            session: Arc::downgrade(session),
        })
    }

    pub fn ret_code(&self) -> Option<i64> {
        self.ret_code
    }

    pub fn err_msg(&self) -> Option<&str> {
        self.err_msg.as_deref()
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn into_raw(self) -> Map<String, Value> {
        self.raw
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.upgrade()
    }

    pub(crate) fn into_parts(self) -> (Map<String, Value>, Weak<Session>) {
        (self.raw, self.session)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("ret_code", &self.ret_code)
            .field("err_msg", &self.err_msg)
            .field("raw", &self.raw)
            .finish()
    }
}

/// 可以由 [`Response`] 转换得到的目标类型
pub trait FromResponse: Sized {
    /// 列表结果对应的集合类型
    type Collection: From<Vec<Self>>;

    fn from_response(response: Response) -> WxResult<Self>;
}

impl FromResponse for Response {
    type Collection = Vec<Response>;

    fn from_response(response: Response) -> WxResult<Self> {
        Ok(response)
    }
}

impl FromResponse for Chat {
    type Collection = Chats;

    fn from_response(response: Response) -> WxResult<Self> {
        let (raw, session) = response.into_parts();
        Chat::from_value(Value::Object(raw), session)
    }
}

impl FromResponse for Group {
    type Collection = Groups;

    fn from_response(response: Response) -> WxResult<Self> {
        let (raw, session) = response.into_parts();
        Ok(Group::new(serde_json::from_value(Value::Object(raw))?, session))
    }
}

/// 校验后的结果：单个对象，或列表对应的集合
pub enum Normalized<T: FromResponse> {
    Single(T),
    Collection(T::Collection),
}

impl<T: FromResponse> Normalized<T> {
    pub fn into_single(self) -> Option<T> {
        match self {
            Self::Single(item) => Some(item),
            Self::Collection(_) => None,
        }
    }

    /// 单个对象也包装为只有一项的集合
    pub fn into_collection(self) -> T::Collection {
        match self {
            Self::Single(item) => T::Collection::from(vec![item]),
            Self::Collection(items) => items,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }
}

impl<T> fmt::Debug for Normalized<T>
where
    T: FromResponse + fmt::Debug,
    T::Collection: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(item) => f.debug_tuple("Single").field(item).finish(),
            Self::Collection(items) => f.debug_tuple("Collection").field(items).finish(),
        }
    }
}

/// 检查传输层返回值，并转为 `T`
///
/// - 空值直接返回 `Ok(None)`，不解析会话，也不构建任何对象
/// - 会话从 `caller` 解析，找不到时返回 [`Error::Misconfigured`]
/// - 任一字典的状态码非 0 时返回 [`Error::Response`]
/// - 列表结果转为 `T::Collection`，其余返回单个 `T`
pub fn handle_response<T: FromResponse>(
    ret: Value,
    caller: &dyn SessionBound,
    operation: &str,
) -> WxResult<Option<Normalized<T>>> {
    if !is_truthy(&ret) {
        debug!("[Response] {} 返回空结果", operation);
        return Ok(None);
    }

    let session = resolve_session(caller, operation)?;

    let responses = list_or_single(|raw| Response::new(raw, &session), OneOrMany::from(ret))
        .transpose()?;
    let converted = list_or_single(T::from_response, responses).transpose()?;

    Ok(Some(match converted {
        OneOrMany::One(item) => Normalized::Single(item),
        OneOrMany::Many(items) => {
            debug!("[Response] {} 返回 {} 项", operation, items.len());
            Normalized::Collection(T::Collection::from(items))
        }
    }))
}
