//! 执行上下文
//!
//! 不可变、可派生、可取消的请求级状态载体。
//!
//! - 每个节点持有父节点引用、取消令牌以及至多一个条目
//! - 查找从当前节点向根节点逐级进行，先找到的条目生效
//! - 派生子节点不会修改父节点；取消子节点不会影响父节点
//! - 取消状态只能设置一次且不可恢复

use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

use crate::error::Failure;

/// 请求执行上下文
///
/// `Clone` 只复制一个 `Arc`，可以自由地在 gear 之间传递。
#[derive(Clone)]
pub struct Context {
    node: Arc<Node>,
}

struct Node {
    parent: Option<Context>,
    token: CancellationToken,
    entry: Entry,
}

// 逐级解开父链，避免深层链在析构时递归
impl Drop for Node {
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(ctx) = parent {
            parent = match Arc::try_unwrap(ctx.node) {
                Ok(mut node) => node.parent.take(),
                Err(_) => None,
            };
        }
    }
}

/// 节点上的条目
enum Entry {
    Empty,
    Failure(Failure),
    StartedAt(DateTime<Utc>),
    Value {
        key: String,
        value: Arc<dyn Any + Send + Sync>,
    },
}

impl Context {
    /// 创建根上下文
    ///
    /// 根上下文永远不会被取消（没有对外暴露取消句柄），
    /// 通常每个进程创建一次并注入到 handler 中。
    pub fn background() -> Self {
        Self {
            node: Arc::new(Node {
                parent: None,
                token: CancellationToken::new(),
                entry: Entry::Empty,
            }),
        }
    }

    fn derive(&self, token: CancellationToken, entry: Entry) -> Self {
        Self {
            node: Arc::new(Node {
                parent: Some(self.clone()),
                token,
                entry,
            }),
        }
    }

    /// 派生一个带独立取消句柄的子上下文
    pub fn with_cancel(&self) -> (Context, CancelHandle) {
        let token = self.node.token.child_token();
        let handle = CancelHandle {
            token: token.clone(),
        };
        (self.derive(token, Entry::Empty), handle)
    }

    /// 返回一个已取消、不带失败值的子上下文
    ///
    /// 表示"请求已由当前 gear 处理完毕"，后续 gear 和终端函数都不会执行，
    /// 也不会渲染错误响应。
    pub fn cancel(&self) -> Context {
        let (ctx, handle) = self.with_cancel();
        handle.cancel();
        ctx
    }

    /// 返回一个已取消并附带失败值的子上下文
    pub fn with_error(&self, failure: impl Into<Failure>) -> Context {
        let canceled = self.cancel();
        let token = canceled.node.token.clone();
        canceled.derive(token, Entry::Failure(failure.into()))
    }

    /// 记录请求开始时间
    pub fn with_started_at(&self, at: DateTime<Utc>) -> Context {
        self.derive(self.node.token.clone(), Entry::StartedAt(at))
    }

    /// 附加自定义键值
    pub fn with_value<T>(&self, key: impl Into<String>, value: T) -> Context
    where
        T: Any + Send + Sync,
    {
        self.derive(
            self.node.token.clone(),
            Entry::Value {
                key: key.into(),
                value: Arc::new(value),
            },
        )
    }

    /// 当前上下文（或其任一祖先）是否已取消
    pub fn is_canceled(&self) -> bool {
        self.node.token.is_cancelled()
    }

    /// 等待上下文被取消
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.node.token.cancelled()
    }

    /// 最近附加的失败值
    pub fn failure(&self) -> Option<&Failure> {
        self.ancestors().find_map(|node| match &node.entry {
            Entry::Failure(failure) => Some(failure),
            _ => None,
        })
    }

    /// 请求开始时间
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.ancestors().find_map(|node| match &node.entry {
            Entry::StartedAt(at) => Some(*at),
            _ => None,
        })
    }

    /// 按键查找自定义值
    ///
    /// 最近一个同名键决定结果；类型不匹配时返回 None，不会继续向上查找。
    pub fn value<T>(&self, key: &str) -> Option<&T>
    where
        T: Any + Send + Sync,
    {
        self.ancestors()
            .find_map(|node| match &node.entry {
                Entry::Value { key: k, value } if k == key => Some(value),
                _ => None,
            })
            .and_then(|value| value.downcast_ref::<T>())
    }

    fn ancestors(&self) -> impl Iterator<Item = &Node> + '_ {
        std::iter::successors(Some(&*self.node), |node| {
            node.parent.as_ref().map(|parent| &*parent.node)
        })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("canceled", &self.is_canceled())
            .field("failure", &self.failure())
            .field("started_at", &self.started_at())
            .finish()
    }
}

/// 子上下文的取消句柄
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// 转换为离开作用域时自动取消的守卫
    pub fn drop_guard(self) -> DropGuard {
        self.token.drop_guard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusError;

    #[test]
    fn test_background_is_active() {
        let ctx = Context::background();
        assert!(!ctx.is_canceled());
        assert!(ctx.failure().is_none());
        assert!(ctx.started_at().is_none());
    }

    #[test]
    fn test_value_lookup_walks_parents() {
        let ctx = Context::background()
            .with_value("token", "abc".to_string())
            .with_value("user_id", 42u64);

        assert_eq!(ctx.value::<String>("token").map(String::as_str), Some("abc"));
        assert_eq!(ctx.value::<u64>("user_id"), Some(&42));
        assert!(ctx.value::<String>("missing").is_none());
    }

    #[test]
    fn test_nearest_value_shadows_and_type_mismatch() {
        let ctx = Context::background()
            .with_value("k", 1u32)
            .with_value("k", "two");

        assert_eq!(ctx.value::<&str>("k"), Some(&"two"));
        // 最近的 "k" 不是 u32，不会回退到祖先
        assert!(ctx.value::<u32>("k").is_none());
    }

    #[test]
    fn test_derive_does_not_mutate_parent() {
        let parent = Context::background().with_value("a", 1i32);
        let child = parent.with_value("b", 2i32);

        assert!(parent.value::<i32>("b").is_none());
        assert_eq!(child.value::<i32>("a"), Some(&1));
    }

    #[test]
    fn test_cancel_child_keeps_parent_active() {
        let parent = Context::background();
        let child = parent.cancel();

        assert!(child.is_canceled());
        assert!(!parent.is_canceled());
        assert!(child.failure().is_none());
    }

    #[test]
    fn test_cancel_parent_propagates_to_descendants() {
        let (scope, handle) = Context::background().with_cancel();
        let grandchild = scope.with_value("x", 1u8).with_started_at(Utc::now());
        assert!(!grandchild.is_canceled());

        handle.cancel();
        assert!(scope.is_canceled());
        assert!(grandchild.is_canceled());
    }

    #[test]
    fn test_drop_guard_cancels_scope() {
        let (scope, handle) = Context::background().with_cancel();
        {
            let _guard = handle.drop_guard();
            assert!(!scope.is_canceled());
        }
        assert!(scope.is_canceled());
    }

    #[test]
    fn test_with_error_attaches_and_cancels() {
        let parent = Context::background();
        let ctx = parent.with_error(StatusError::new(403, "forbidden"));

        assert!(ctx.is_canceled());
        assert_eq!(ctx.failure().map(Failure::status), Some(403));
        assert!(parent.failure().is_none());
        assert!(!parent.is_canceled());
    }

    #[test]
    fn test_siblings_are_isolated() {
        let root = Context::background();
        let a = root.with_value("name", "a").with_error(StatusError::new(500, "a failed"));
        let b = root.with_value("name", "b");

        assert!(a.is_canceled());
        assert!(!b.is_canceled());
        assert!(b.failure().is_none());
        assert_eq!(b.value::<&str>("name"), Some(&"b"));
    }

    #[test]
    fn test_started_at_is_inherited() {
        let at = Utc::now();
        let ctx = Context::background()
            .with_started_at(at)
            .with_value("later", true);
        assert_eq!(ctx.started_at(), Some(at));
    }

    #[test]
    fn test_deep_chain_drops_without_recursion() {
        let mut ctx = Context::background();
        for i in 0..200_000u32 {
            ctx = ctx.with_value("depth", i);
        }
        assert_eq!(ctx.value::<u32>("depth"), Some(&199_999));

        // 中间节点仍被引用时只解开到该节点为止
        let middle = ctx.clone();
        let ctx = ctx.with_value("tail", true);
        drop(ctx);
        assert_eq!(middle.value::<u32>("depth"), Some(&199_999));
        drop(middle);
    }

    #[test]
    fn test_context_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Context>();
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let (scope, handle) = Context::background().with_cancel();
        let waiter = scope.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });
        handle.cancel();
        task.await.unwrap();
        assert!(scope.is_canceled());
    }
}
