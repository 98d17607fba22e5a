//! # gears
//!
//! 可组合的请求中间件引擎。
//!
//! 一组 gear 按顺序处理每个请求；任何 gear 都可以取消上下文让链路短路，
//! 并附加一个结构化的失败值。只有在没有短路时终端处理函数才会执行。
//!
//! ## 示例
//!
//! ```ignore
//! use gears::prelude::*;
//! use std::io::Write;
//!
//! fn require_token(ctx: Context, _w: &mut dyn ResponseSink, r: &Request) -> Option<Context> {
//!     match r.headers().get("authorization") {
//!         Some(token) => Some(ctx.with_value("token", token.clone())),
//!         None => Some(ctx.with_error(StatusError::new(401, "missing token"))),
//!     }
//! }
//!
//! fn hello(w: &mut dyn ResponseSink, _r: &Request) {
//!     let _ = w.write_all(br#"{"message":"Hello World"}"#);
//! }
//!
//! let handler = GearsHandler::builder(hello).gear(require_token).build();
//! let app = axum::Router::new().route_service("/main", handler);
//! ```

pub use gears_core::{
    chain, render, shape, BufferedResponse, CancelHandle, CodedError, ConfigError, Context,
    DetailedError, DynContextHandler, DynGear, DynHandlerFn, DynService, ErrorBody, Failure, Gear,
    IntoGear, Request, ResponseSink, Serve, ServeHttp, StatusError, NIL_CONTEXT_MESSAGE,
    UNKNOWN_ERROR_CODE, UNKNOWN_ERROR_DESCRIPTION,
};
pub use gears_server::{
    DynLogger, GearsHandler, HandlerBuilder, HandlerConfig, Logger, ResponseRecorder,
    TracingLogger, WriterLogger,
};

/// 编写 gear 和 handler 时常用的类型
pub mod prelude {
    pub use gears_core::{
        chain, CodedError, Context, DetailedError, Failure, Gear, IntoGear, Request,
        ResponseSink, Serve, ServeHttp, StatusError,
    };
    pub use gears_server::{GearsHandler, HandlerConfig, Logger};
}
