//! 响应写入接口
//!
//! gear 通过 [`ResponseSink`] 写响应头、状态码和响应体。
//! [`BufferedResponse`] 是内存实现，最终转换为 axum 的 `Response`。

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::io;

/// gear 处理的请求类型
pub type Request = axum::http::Request<Body>;

/// 响应写入器
///
/// 响应体通过 `io::Write` 写入。状态码只有第一次写入生效；
/// 在写入状态码之前写响应体，视为隐式写入 200。
pub trait ResponseSink: io::Write {
    /// 可变响应头
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// 写入状态码
    fn write_header(&mut self, status: StatusCode);
}

/// 缓冲式响应
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已提交的状态码（未提交时为 None）
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl io::Write for BufferedResponse {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseSink for BufferedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        match self.status {
            Some(committed) => {
                tracing::debug!(
                    committed = %committed,
                    ignored = %status,
                    "状态码已提交，忽略重复写入"
                );
            }
            None => self.status = Some(status),
        }
    }
}

impl IntoResponse for BufferedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::HeaderValue;
    use std::io::Write;

    #[test]
    fn test_first_status_wins() {
        let mut w = BufferedResponse::new();
        w.write_header(StatusCode::CREATED);
        w.write_header(StatusCode::BAD_REQUEST);
        assert_eq!(w.status(), Some(StatusCode::CREATED));
    }

    #[test]
    fn test_write_implies_ok() {
        let mut w = BufferedResponse::new();
        w.write_all(b"hello").unwrap();
        w.write_header(StatusCode::NOT_FOUND);
        assert_eq!(w.status(), Some(StatusCode::OK));
        assert_eq!(w.body(), b"hello");
    }

    #[test]
    fn test_into_response_defaults_to_ok() {
        let mut w = BufferedResponse::new();
        w.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let response = w.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_sink_usable_as_trait_object() {
        let mut w = BufferedResponse::new();
        {
            let sink: &mut dyn ResponseSink = &mut w;
            sink.write_header(StatusCode::ACCEPTED);
            write!(sink, "{}-{}", "a", 1).unwrap();
        }
        assert_eq!(w.status(), Some(StatusCode::ACCEPTED));
        assert_eq!(w.body(), b"a-1");
    }
}
