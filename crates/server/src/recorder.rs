//! 响应记录器
//!
//! 包装真实的响应写入器，记录第一次提交的状态码，其它调用原样透传。

use axum::http::{HeaderMap, StatusCode};
use gears_core::ResponseSink;
use std::io;

/// 记录已提交状态码的响应写入器
pub struct ResponseRecorder<'a> {
    inner: &'a mut dyn ResponseSink,
    status: Option<StatusCode>,
}

impl<'a> ResponseRecorder<'a> {
    pub fn new(inner: &'a mut dyn ResponseSink) -> Self {
        Self {
            inner,
            status: None,
        }
    }

    /// 已提交的状态码，未显式写入时为 200
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// 是否已经提交过状态码（显式写入或隐式写入响应体）
    pub fn committed(&self) -> bool {
        self.status.is_some()
    }
}

impl io::Write for ResponseRecorder<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // 先写响应体等同于隐式提交 200
        self.status.get_or_insert(StatusCode::OK);
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ResponseSink for ResponseRecorder<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
        self.inner.write_header(status);
    }
}
