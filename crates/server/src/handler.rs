//! 请求处理器
//!
//! 把一组 gear、终端处理函数、完成日志组合成一个可挂载到 axum 路由的 handler。
//!
//! 每个请求的处理流程：
//! 1. 从根上下文派生可取消的请求上下文，记录开始时间
//! 2. 用 [`ResponseRecorder`] 包装响应写入器
//! 3. 执行 gear 链
//! 4. 上下文被取消：渲染失败值（没有失败值则什么也不写），跳过终端函数
//! 5. 否则执行终端函数
//! 6. 无论走哪条分支，都输出一行完成日志

use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures::future::{ready, Ready};
use gears_core::{
    chain, render, shape, BufferedResponse, ConfigError, Context, Gear, IntoGear, Request,
    ResponseSink, ServeHttp,
};
use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tower::Service;

use crate::config::HandlerConfig;
use crate::logger::{DynLogger, Logger, WriterLogger};
use crate::recorder::ResponseRecorder;

/// 带完成日志的 gear 处理器
///
/// `Clone` 只复制一个 `Arc`，可以同时被多个连接使用。
#[derive(Clone)]
pub struct GearsHandler {
    inner: Arc<Inner>,
}

struct Inner {
    gear: Gear,
    terminal: Gear,
    logger: DynLogger,
    background: Context,
    config: HandlerConfig,
}

impl GearsHandler {
    /// 以终端处理函数创建构建器，终端函数可以是任意一种 gear 形态
    pub fn builder<M>(terminal: impl IntoGear<M>) -> HandlerBuilder {
        HandlerBuilder {
            terminal: terminal.into_gear(),
            gears: Vec::new(),
            logger: None,
            background: None,
            config: HandlerConfig::default(),
        }
    }

    /// 使用默认日志和根上下文创建 handler
    pub fn new<M, I>(terminal: impl IntoGear<M>, gears: I) -> Self
    where
        I: IntoIterator<Item = Gear>,
    {
        Self::builder(terminal).gears(gears).build()
    }

    /// 处理一个请求
    pub fn serve(&self, w: &mut dyn ResponseSink, r: &Request) {
        let inner = &*self.inner;

        let (scope, handle) = inner.background.with_cancel();
        let _guard = handle.drop_guard();
        let started_at = Utc::now();
        let ctx = scope.with_started_at(started_at);

        let mut recorder = ResponseRecorder::new(w);
        let ctx = inner.gear.run(ctx, &mut recorder, r);

        let ctx = if ctx.is_canceled() {
            ctx
        } else {
            inner.terminal.run(ctx, &mut recorder, r)
        };
        if ctx.is_canceled() {
            render::write_failure(&ctx, &mut recorder, inner.config.trailing_newline);
        }

        if inner.config.log_requests {
            let start = ctx.started_at().unwrap_or(started_at);
            let elapsed = (Utc::now() - start).to_std().unwrap_or_default();
            inner.logger.log(format_args!(
                "\"{} {}\" {} in {:?}",
                r.method(),
                r.uri().path(),
                recorder.status().as_u16(),
                elapsed
            ));
        }
    }

    /// 处理一个请求并返回缓冲后的响应
    pub fn handle(&self, r: Request) -> Response {
        let mut w = BufferedResponse::new();
        self.serve(&mut w, &r);
        w.into_response()
    }
}

impl fmt::Debug for GearsHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GearsHandler")
            .field("gear", &self.inner.gear)
            .field("terminal", &self.inner.terminal)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ServeHttp for GearsHandler {
    fn serve_http(&self, w: &mut dyn ResponseSink, r: &Request) {
        self.serve(w, r)
    }
}

impl IntoGear<shape::Service> for GearsHandler {
    fn into_gear(self) -> Gear {
        Gear::from_service(self)
    }
}

impl Service<Request> for GearsHandler {
    type Response = Response;
    type Error = Infallible;
    type Future = Ready<Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        ready(Ok(self.handle(req)))
    }
}

/// [`GearsHandler`] 构建器
pub struct HandlerBuilder {
    terminal: Gear,
    gears: Vec<Gear>,
    logger: Option<DynLogger>,
    background: Option<Context>,
    config: HandlerConfig,
}

impl HandlerBuilder {
    /// 追加一个 gear（任意形态）
    pub fn gear<M>(mut self, gear: impl IntoGear<M>) -> Self {
        self.gears.push(gear.into_gear());
        self
    }

    /// 追加多个 gear
    pub fn gears<I>(mut self, gears: I) -> Self
    where
        I: IntoIterator<Item = Gear>,
    {
        self.gears.extend(gears);
        self
    }

    /// 追加一个动态类型的 gear，不支持的类型返回配置错误
    pub fn try_gear<T>(self, value: T) -> Result<Self, ConfigError>
    where
        T: Any + Send + Sync,
    {
        let gear = Gear::from_any(value)?;
        Ok(self.gear(gear))
    }

    /// 自定义完成日志，默认按行写入 stdout（[`WriterLogger::stdout`]）
    ///
    /// 需要输出到 tracing 时传入 [`TracingLogger`](crate::TracingLogger)。
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// 使用共享的完成日志
    pub fn shared_logger(mut self, logger: DynLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// 注入根上下文，默认使用 [`Context::background`]
    pub fn background(mut self, background: Context) -> Self {
        self.background = Some(background);
        self
    }

    pub fn config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> GearsHandler {
        GearsHandler {
            inner: Arc::new(Inner {
                gear: chain(self.gears),
                terminal: self.terminal,
                logger: self.logger.unwrap_or_else(|| Arc::new(WriterLogger::stdout())),
                background: self.background.unwrap_or_else(Context::background),
                config: self.config,
            }),
        }
    }
}
