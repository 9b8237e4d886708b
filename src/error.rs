//! 错误类型定义
//!
//! 这个模块定义了库中使用的所有错误类型，使用 thiserror 提供丰富的错误信息。

use std::path::PathBuf;

/// 流日志解析器的结果类型
pub type Result<T> = std::result::Result<T, FlowlogError>;

/// 流日志解析和聚合错误类型
#[derive(Debug, thiserror::Error)]
pub enum FlowlogError {
    /// IO 错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// 缓存编解码错误
    #[error("缓存编解码错误: {0}")]
    Encode(#[from] bincode::Error),

    /// SQLite 错误
    #[error("SQLite错误: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// 行格式错误，包含文件、行号和原始内容
    #[error("日志格式错误: {} 行{line}: {content}", .file.display())]
    MalformedRow { file: PathBuf, line: usize, content: String },

    /// 表头缺少必需列
    #[error("日志缺少必需列 {column}: {}", .file.display())]
    MissingColumn { file: PathBuf, column: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 输出目标已存在（拒绝覆盖）
    #[error("输出目标已存在: {}", .0.display())]
    OutputExists(PathBuf),

    /// 工作线程错误
    #[error("工作线程错误: {0}")]
    Worker(String),

    /// 其他错误
    #[error("未知错误: {0}")]
    Other(String),
}

impl FlowlogError {
    /// 创建一个行格式错误
    pub fn malformed_row(
        file: impl Into<PathBuf>,
        line: usize,
        content: impl Into<String>,
    ) -> Self {
        Self::MalformedRow {
            file: file.into(),
            line,
            content: content.into(),
        }
    }

    /// 创建一个缺列错误
    pub fn missing_column(
        file: impl Into<PathBuf>,
        column: impl Into<String>,
    ) -> Self {
        Self::MissingColumn { file: file.into(), column: column.into() }
    }

    /// 创建一个配置错误
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// 创建一个工作线程错误
    pub fn worker<S: Into<String>>(message: S) -> Self {
        Self::Worker(message.into())
    }

    /// 创建一个其他类型错误
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }

    /// 检查是否为 IO 错误
    pub fn is_io_error(&self) -> bool {
        matches!(self, FlowlogError::Io(_))
    }

    /// 检查是否为行格式错误
    pub fn is_malformed_row(&self) -> bool {
        matches!(self, FlowlogError::MalformedRow { .. })
    }

    /// 检查是否为配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(self, FlowlogError::Config(_))
    }

    /// 检查是否为输出目标冲突错误
    pub fn is_output_exists(&self) -> bool {
        matches!(self, FlowlogError::OutputExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let row_err = FlowlogError::malformed_row("a.log.gz", 10, "bad row");
        assert!(row_err.is_malformed_row());

        let col_err = FlowlogError::missing_column("a.log.gz", "bytes");
        assert!(!col_err.is_malformed_row());

        let config_err = FlowlogError::config("missing field");
        assert!(config_err.is_config_error());
        assert!(!config_err.is_io_error());
    }

    #[test]
    fn test_error_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let flow_err: FlowlogError = io_err.into();
        assert!(flow_err.is_io_error());
    }

    #[test]
    fn test_error_display() {
        let err = FlowlogError::MalformedRow {
            file: PathBuf::from("dir/a.log.gz"),
            line: 42,
            content: "acct - - x".to_string(),
        };

        let display = format!("{}", err);
        assert!(display.contains("42"));
        assert!(display.contains("acct - - x"));
        assert!(display.contains("a.log.gz"));
    }

    #[test]
    fn test_output_exists_display() {
        let err = FlowlogError::OutputExists(PathBuf::from("flow.sqlite"));
        assert!(err.is_output_exists());
        assert!(format!("{}", err).contains("flow.sqlite"));
    }
}
