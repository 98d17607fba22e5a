//! Gears Core
//!
//! 中间件组合引擎的核心类型：
//!
//! ## 模块结构
//!
//! - `error` - 失败值分类与统一错误响应体
//! - `context` - 不可变、可派生、可取消的执行上下文
//! - `sink` - 响应写入接口与缓冲实现
//! - `gear` - gear 签名与四种形态的适配
//! - `chain` - 顺序执行与短路规则
//! - `render` - 把失败值渲染为 JSON 错误响应

pub mod chain;
pub mod context;
pub mod error;
pub mod gear;
pub mod render;
pub mod sink;

// 重新导出
pub use chain::chain;
pub use context::{CancelHandle, Context};
pub use error::{
    CodedError, ConfigError, DetailedError, ErrorBody, Failure, StatusError, NIL_CONTEXT_MESSAGE,
    UNKNOWN_ERROR_CODE, UNKNOWN_ERROR_DESCRIPTION,
};
pub use gear::{
    shape, DynContextHandler, DynGear, DynHandlerFn, DynService, Gear, IntoGear, Serve, ServeHttp,
};
pub use sink::{BufferedResponse, Request, ResponseSink};
