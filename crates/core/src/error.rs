//! 失败值分类
//!
//! gear 短路时可以在上下文上附加一个失败值。失败值分三个能力层级：
//! - `StatusError` - 状态码 + 消息
//! - `CodedError` - 状态码 + 机器码 + 描述
//! - `DetailedError` - 在 `CodedError` 基础上附带结构化详情
//!
//! 另外还有 `Failure::Unknown` 兜底，用于无法归类的原始值。
//! 所有层级最终都通过 [`Failure::resolve`] 归一化为 [`ErrorBody`]。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// gear 返回空上下文时由链执行器合成的消息
pub const NIL_CONTEXT_MESSAGE: &str = "Middleware returned nil context";

/// 未知失败值的机器码
pub const UNKNOWN_ERROR_CODE: &str = "unknown_error";

/// 未知失败值的描述
pub const UNKNOWN_ERROR_DESCRIPTION: &str = "application returned invalid error message";

/// 只有状态码和消息的失败
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status} {message}")]
pub struct StatusError {
    pub status: u16,
    pub message: String,
}

impl StatusError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// 带机器码和人类可读描述的失败
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status} {description}")]
pub struct CodedError {
    pub status: u16,
    pub code: String,
    pub description: String,
}

impl CodedError {
    pub fn new(status: u16, code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            description: description.into(),
        }
    }
}

/// 带结构化详情的失败
///
/// 详情在构造时序列化为 JSON 值；序列化失败时丢弃详情，失败本身仍然保留。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{status} {description}")]
pub struct DetailedError {
    pub status: u16,
    pub code: String,
    pub description: String,
    pub details: Option<Value>,
}

impl DetailedError {
    pub fn new<T>(
        status: u16,
        code: impl Into<String>,
        description: impl Into<String>,
        details: &T,
    ) -> Self
    where
        T: Serialize + ?Sized,
    {
        Self {
            status,
            code: code.into(),
            description: description.into(),
            details: to_json_or_drop(details),
        }
    }
}

/// 附加在上下文上的失败值
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Failure {
    #[error(transparent)]
    Status(#[from] StatusError),

    #[error(transparent)]
    Coded(#[from] CodedError),

    #[error(transparent)]
    Detailed(#[from] DetailedError),

    /// 无法归类的原始值（已转为 JSON，转换失败时为 None）
    #[error("500 {}", UNKNOWN_ERROR_DESCRIPTION)]
    Unknown(Option<Value>),
}

impl Failure {
    /// 用任意可序列化的原始值构造未知失败
    pub fn unknown<T: Serialize + ?Sized>(raw: &T) -> Self {
        Failure::Unknown(to_json_or_drop(raw))
    }

    /// 链执行器在 gear 返回空上下文时使用的失败
    pub fn nil_context() -> Self {
        StatusError::new(500, NIL_CONTEXT_MESSAGE).into()
    }

    /// 失败对应的状态码
    pub fn status(&self) -> u16 {
        match self {
            Failure::Status(e) => e.status,
            Failure::Coded(e) => e.status,
            Failure::Detailed(e) => e.status,
            Failure::Unknown(_) => 500,
        }
    }

    /// 按能力层级从高到低解析为统一响应体
    pub fn resolve(&self) -> ErrorBody {
        match self {
            Failure::Detailed(e) => ErrorBody {
                status: e.status,
                code: e.code.clone(),
                description: e.description.clone(),
                details: e.details.clone(),
            },
            Failure::Coded(e) => ErrorBody {
                status: e.status,
                code: e.code.clone(),
                description: e.description.clone(),
                details: None,
            },
            Failure::Status(e) => ErrorBody {
                status: e.status,
                code: String::new(),
                description: e.message.clone(),
                details: None,
            },
            Failure::Unknown(raw) => ErrorBody {
                status: 500,
                code: UNKNOWN_ERROR_CODE.to_string(),
                description: UNKNOWN_ERROR_DESCRIPTION.to_string(),
                details: raw.clone(),
            },
        }
    }
}

/// 归一化的错误响应体
///
/// 线上格式：`{"status": int, "code": string, "description": string, "details"?: any}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    #[serde(default)]
    pub code: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// 组装阶段的配置错误
///
/// 只在注册 gear 时产生，请求处理过程中不会出现。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("不支持的 gear 类型: {type_name}")]
    UnsupportedShape { type_name: &'static str },
}

fn to_json_or_drop<T: Serialize + ?Sized>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "失败详情无法序列化，已丢弃");
            None
        }
    }
}
