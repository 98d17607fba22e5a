//! Gear 与适配层
//!
//! Gear 是统一的中间件签名：
//! `(Context, &mut dyn ResponseSink, &Request) -> Option<Context>`。
//! 返回 `None` 表示 gear 实现有缺陷（由链执行器转换为 500）。
//!
//! 支持四种可适配的形态：
//! - A：`Fn(Context, &mut dyn ResponseSink, &Request) -> Option<Context>`，原样使用
//! - B：`Fn(&Context, &mut dyn ResponseSink, &Request)`，执行后原样返回输入上下文
//! - C：`Fn(&mut dyn ResponseSink, &Request)`，忽略上下文
//! - D：任意 [`ServeHttp`] 实现，执行后原样返回输入上下文
//!
//! 形态在组装时静态确定（[`IntoGear`]）；只有动态类型的值才走
//! [`Gear::from_any`]，不支持的类型在组装阶段返回 [`ConfigError`]。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::chain;
use crate::context::Context;
use crate::error::{ConfigError, Failure};
use crate::render;
use crate::sink::{Request, ResponseSink};

/// 形态 A 的动态函数对象
pub type DynGear =
    Arc<dyn Fn(Context, &mut dyn ResponseSink, &Request) -> Option<Context> + Send + Sync>;

/// 形态 B 的动态函数对象
pub type DynContextHandler = Arc<dyn Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync>;

/// 形态 C 的动态函数对象
pub type DynHandlerFn = Arc<dyn Fn(&mut dyn ResponseSink, &Request) + Send + Sync>;

/// 形态 D 的动态对象
pub type DynService = Arc<dyn ServeHttp>;

/// 直接处理请求的能力（不感知上下文）
pub trait ServeHttp: Send + Sync {
    fn serve_http(&self, w: &mut dyn ResponseSink, r: &Request);
}

impl<T: ServeHttp + ?Sized> ServeHttp for Arc<T> {
    fn serve_http(&self, w: &mut dyn ResponseSink, r: &Request) {
        (**self).serve_http(w, r)
    }
}

impl<T: ServeHttp + ?Sized> ServeHttp for Box<T> {
    fn serve_http(&self, w: &mut dyn ResponseSink, r: &Request) {
        (**self).serve_http(w, r)
    }
}

/// 中间件单元
///
/// 构造后不可变；`Clone` 只复制引用计数。
#[derive(Clone)]
pub struct Gear {
    pub(crate) kind: GearKind,
}

#[derive(Clone)]
pub(crate) enum GearKind {
    Single(DynGear),
    Chain(Arc<[Gear]>),
}

impl Gear {
    /// 形态 A
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Context, &mut dyn ResponseSink, &Request) -> Option<Context> + Send + Sync + 'static,
    {
        Self {
            kind: GearKind::Single(Arc::new(f)),
        }
    }

    /// 形态 B
    pub fn from_context_handler<F>(f: F) -> Self
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        Self::new(move |ctx, w, r| {
            f(&ctx, w, r);
            Some(ctx)
        })
    }

    /// 形态 C
    pub fn from_handler_fn<F>(f: F) -> Self
    where
        F: Fn(&mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        Self::new(move |ctx, w, r| {
            f(w, r);
            Some(ctx)
        })
    }

    /// 形态 D
    pub fn from_service<S>(service: S) -> Self
    where
        S: ServeHttp + 'static,
    {
        Self::new(move |ctx, w, r| {
            service.serve_http(w, r);
            Some(ctx)
        })
    }

    /// 从动态类型的值构造 gear
    ///
    /// 只接受 `Gear` 以及四种形态对应的 `Dyn*` 类型，
    /// 其它类型返回 [`ConfigError::UnsupportedShape`]。
    pub fn from_any<T>(value: T) -> Result<Self, ConfigError>
    where
        T: Any + Send + Sync,
    {
        let type_name = std::any::type_name::<T>();
        let boxed: Box<dyn Any + Send + Sync> = Box::new(value);

        let boxed = match boxed.downcast::<Gear>() {
            Ok(gear) => return Ok(*gear),
            Err(other) => other,
        };
        let boxed = match boxed.downcast::<DynGear>() {
            Ok(f) => {
                return Ok(Self {
                    kind: GearKind::Single(*f),
                })
            }
            Err(other) => other,
        };
        let boxed = match boxed.downcast::<DynContextHandler>() {
            Ok(f) => return Ok(Self::from_context_handler(move |c, w, r| f(c, w, r))),
            Err(other) => other,
        };
        let boxed = match boxed.downcast::<DynHandlerFn>() {
            Ok(f) => return Ok(Self::from_handler_fn(move |w, r| f(w, r))),
            Err(other) => other,
        };
        match boxed.downcast::<DynService>() {
            Ok(service) => Ok(Self::from_service(*service)),
            Err(_) => Err(ConfigError::UnsupportedShape { type_name }),
        }
    }

    /// 执行 gear
    pub fn call(&self, ctx: Context, w: &mut dyn ResponseSink, r: &Request) -> Option<Context> {
        match &self.kind {
            GearKind::Single(f) => f(ctx, w, r),
            GearKind::Chain(gears) => Some(chain::run(gears, ctx, w, r)),
        }
    }

    /// 执行 gear，返回 `None` 时在输入上下文上附加 nil context 失败
    pub fn run(&self, ctx: Context, w: &mut dyn ResponseSink, r: &Request) -> Context {
        match self.call(ctx.clone(), w, r) {
            Some(next) => next,
            None => ctx.with_error(Failure::nil_context()),
        }
    }

    /// 以给定根上下文独立处理一个请求（不输出完成日志）
    pub fn serve_with(
        &self,
        background: &Context,
        w: &mut dyn ResponseSink,
        r: &Request,
        trailing_newline: bool,
    ) {
        let (ctx, handle) = background.with_cancel();
        let _guard = handle.drop_guard();

        let ctx = self.run(ctx, w, r);
        if ctx.is_canceled() {
            render::write_failure(&ctx, w, trailing_newline);
        }
    }
}

impl ServeHttp for Gear {
    fn serve_http(&self, w: &mut dyn ResponseSink, r: &Request) {
        self.serve_with(&Context::background(), w, r, true)
    }
}

impl fmt::Debug for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GearKind::Single(_) => f.write_str("Gear"),
            GearKind::Chain(gears) => f.debug_struct("Chain").field("len", &gears.len()).finish(),
        }
    }
}

/// 形态标记，用于在编译期区分四种形态
pub mod shape {
    /// 已经是 [`Gear`](super::Gear)
    pub struct Canonical;
    /// 形态 A
    pub struct ContextGear;
    /// 形态 B
    pub struct ContextHandler;
    /// 形态 C
    pub struct HandlerFn;
    /// 形态 D
    pub struct Service;
}

/// 可以转换为 [`Gear`] 的类型
pub trait IntoGear<Marker>: Sized {
    fn into_gear(self) -> Gear;
}

impl IntoGear<shape::Canonical> for Gear {
    fn into_gear(self) -> Gear {
        self
    }
}

impl<F> IntoGear<shape::ContextGear> for F
where
    F: Fn(Context, &mut dyn ResponseSink, &Request) -> Option<Context> + Send + Sync + 'static,
{
    fn into_gear(self) -> Gear {
        Gear::new(self)
    }
}

impl<F> IntoGear<shape::ContextHandler> for F
where
    F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
{
    fn into_gear(self) -> Gear {
        Gear::from_context_handler(self)
    }
}

impl<F> IntoGear<shape::HandlerFn> for F
where
    F: Fn(&mut dyn ResponseSink, &Request) + Send + Sync + 'static,
{
    fn into_gear(self) -> Gear {
        Gear::from_handler_fn(self)
    }
}

/// 把任意 [`ServeHttp`] 实现标记为形态 D
pub struct Serve<S>(pub S);

impl<S> IntoGear<shape::Service> for Serve<S>
where
    S: ServeHttp + 'static,
{
    fn into_gear(self) -> Gear {
        Gear::from_service(self.0)
    }
}
