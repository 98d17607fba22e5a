//! 失败渲染
//!
//! 把已取消上下文上的失败值渲染为 JSON 错误响应。
//! 没有失败值时视为 gear 已自行完成响应，不写入任何内容。

use axum::http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderValue, StatusCode};

use crate::context::Context;
use crate::error::ErrorBody;
use crate::sink::ResponseSink;

/// 响应体编码失败时使用的固定响应体
const FALLBACK_BODY: &[u8] = br#"{"status":500,"code":"unknown_error","description":"application returned invalid error message"}"#;

/// 渲染已取消上下文上的失败值
///
/// 返回写入的状态码；没有失败值（静默停止）时返回 None。
pub fn write_failure(
    ctx: &Context,
    w: &mut dyn ResponseSink,
    trailing_newline: bool,
) -> Option<StatusCode> {
    let Some(failure) = ctx.failure() else {
        tracing::debug!("上下文已取消且没有失败值，请求已由 gear 处理");
        return None;
    };

    Some(write_error_body(w, failure.resolve(), trailing_newline))
}

/// 写入统一格式的错误响应
pub fn write_error_body(
    w: &mut dyn ResponseSink,
    mut body: ErrorBody,
    trailing_newline: bool,
) -> StatusCode {
    let status = match StatusCode::from_u16(body.status) {
        Ok(status) => status,
        Err(_) => {
            tracing::warn!(status = body.status, "无效的状态码，改用 500");
            body.status = 500;
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let encoded = match serde_json::to_vec(&body) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!(error = %e, "错误响应体编码失败，使用固定响应体");
            FALLBACK_BODY.to_vec()
        }
    };

    let headers = w.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    w.write_header(status);

    let written = w.write_all(&encoded).and_then(|_| {
        if trailing_newline {
            w.write_all(b"\n")
        } else {
            Ok(())
        }
    });
    if let Err(e) = written {
        tracing::warn!(error = %e, "写入错误响应失败");
    }

    status
}
