//! 实体层错误类型

use thiserror::Error;

/// 实体层操作的结果类型
pub type WxResult<T> = Result<T, Error>;

/// 实体层错误
#[derive(Debug, Error)]
pub enum Error {
    /// 服务端返回了非 0 状态码（BaseResponse.Ret）
    #[error("响应错误 code: {code}; msg: {}", message.as_deref().unwrap_or(""))]
    Response { code: i64, message: Option<String> },

    /// 调用方没有可用的会话引用，属于构造阶段的编程错误
    #[error("会话未找到\n操作: {operation}\n对象: {entity}")]
    Misconfigured { operation: String, entity: String },

    /// 两种编码都无法在字节上限内截断名称
    #[error("无法截断群名称: {name}")]
    NameTruncation { name: String },

    /// 无法从中解析出 UserName 的用户标识
    #[error("无法解析用户标识: {value}")]
    UnresolvedUser { value: String },

    /// 刷新类请求没有返回可用数据
    #[error("{operation} 没有返回数据")]
    MissingPayload { operation: String },

    /// 传输层自身的失败
    #[error("传输层错误: {0}")]
    Transport(#[from] anyhow::Error),

    /// 无法解析为实体的数据
    #[error("解析实体数据失败: {0}")]
    Payload(#[from] serde_json::Error),
}

impl Error {
    pub fn misconfigured(operation: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::Misconfigured {
            operation: operation.into(),
            entity: entity.into(),
        }
    }

    pub fn missing_payload(operation: impl Into<String>) -> Self {
        Self::MissingPayload {
            operation: operation.into(),
        }
    }

    /// 服务端状态码，仅 `Response` 错误有值
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Response { code, .. } => Some(*code),
            _ => None,
        }
    }
}
