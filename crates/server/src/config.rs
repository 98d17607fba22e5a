//! Handler 配置
//!
//! 控制完成日志和错误响应体格式

use serde::{Deserialize, Serialize};

/// Handler 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// 是否在每个请求结束时输出完成日志，默认开启
    #[serde(default = "default_log_requests")]
    pub log_requests: bool,
    /// 错误响应体末尾是否追加换行，默认开启
    #[serde(default = "default_trailing_newline")]
    pub trailing_newline: bool,
}

fn default_log_requests() -> bool {
    true
}

fn default_trailing_newline() -> bool {
    true
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            log_requests: default_log_requests(),
            trailing_newline: default_trailing_newline(),
        }
    }
}
