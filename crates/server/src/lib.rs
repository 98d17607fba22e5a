//! Gears Server
//!
//! 把 gears-core 的 gear 链包装成带完成日志的请求处理器，
//! 可以直接作为 `tower::Service` 挂载到 axum 路由上。
//!
//! ## 模块结构
//!
//! - `handler` - 请求处理器与构建器
//! - `recorder` - 记录已提交状态码的响应写入器
//! - `logger` - 请求完成日志
//! - `config` - handler 配置

pub mod config;
pub mod handler;
pub mod logger;
pub mod recorder;

// 重新导出
pub use config::HandlerConfig;
pub use handler::{GearsHandler, HandlerBuilder};
pub use logger::{DynLogger, Logger, TracingLogger, WriterLogger};
pub use recorder::ResponseRecorder;
