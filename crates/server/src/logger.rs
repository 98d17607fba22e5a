//! 请求完成日志
//!
//! handler 在每个请求结束时输出一行：
//! `"<METHOD> <PATH>" <STATUS> in <DURATION>`
//!
//! - `WriterLogger` - 写入任意 `io::Write`（stdout、文件、内存缓冲），handler 默认写入 stdout
//! - `TracingLogger` - 输出到 tracing，需要调用方安装 subscriber

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// 完成日志接口
///
/// 日志是尽力而为的，实现不应 panic。
pub trait Logger: Send + Sync {
    fn log(&self, args: fmt::Arguments<'_>);
}

impl<T: Logger + ?Sized> Logger for Arc<T> {
    fn log(&self, args: fmt::Arguments<'_>) {
        (**self).log(args)
    }
}

/// 共享的日志实现
pub type DynLogger = Arc<dyn Logger>;

/// 输出到 tracing 的日志实现
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: "gears", "{}", args);
    }
}

/// 写入 `io::Write` 的日志实现
///
/// 每行以本地时间 `YYYY/MM/DD HH:MM:SS` 开头，写入失败时静默忽略。
pub struct WriterLogger<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterLogger<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> Logger for WriterLogger<W> {
    fn log(&self, args: fmt::Arguments<'_>) {
        let now = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "{} {}", now, args);
    }
}
