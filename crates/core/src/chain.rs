//! 链式执行器
//!
//! 按顺序执行一组 gear：
//! - gear 返回 `None`：在当前上下文上附加 500 失败并取消，立即返回
//! - gear 返回已取消的上下文：立即返回，后续 gear 不再执行
//! - 否则以返回的上下文继续执行下一个 gear
//!
//! 嵌套的链在构造时被展开，`chain([chain([a, b]), c])` 与 `chain([a, b, c])` 等价。

use std::sync::Arc;

use crate::context::Context;
use crate::error::Failure;
use crate::gear::{Gear, GearKind};
use crate::sink::{Request, ResponseSink};

/// 把多个 gear 组合成一个 gear
pub fn chain<I>(gears: I) -> Gear
where
    I: IntoIterator<Item = Gear>,
{
    let mut flat = Vec::new();
    for gear in gears {
        match gear.kind {
            GearKind::Chain(inner) => flat.extend(inner.iter().cloned()),
            single @ GearKind::Single(_) => flat.push(Gear { kind: single }),
        }
    }

    Gear {
        kind: GearKind::Chain(Arc::from(flat)),
    }
}

pub(crate) fn run(gears: &[Gear], ctx: Context, w: &mut dyn ResponseSink, r: &Request) -> Context {
    let mut current = ctx;

    for (index, gear) in gears.iter().enumerate() {
        match gear.call(current.clone(), w, r) {
            None => {
                tracing::warn!(index, path = %r.uri().path(), "gear 返回了空上下文");
                return current.with_error(Failure::nil_context());
            }
            Some(next) if next.is_canceled() => {
                tracing::debug!(
                    index,
                    total = gears.len(),
                    has_failure = next.failure().is_some(),
                    "上下文已取消，链路短路"
                );
                return next;
            }
            Some(next) => current = next,
        }
    }

    current
}
