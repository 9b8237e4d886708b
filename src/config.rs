//! 配置管理模块
//!
//! 提供流水线运行配置的定义和校验。配置由命令行参数填充。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{FlowlogError, Result};
use crate::flowlog::SummaryField;

/// 工作线程默认保留给系统的核数
const RESERVED_CPUS: usize = 2;

/// 流水线运行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 流日志根目录（一个或多个）
    pub flow_dirs: Vec<PathBuf>,
    /// 汇总文件输出路径（可选）
    pub summary_file: Option<PathBuf>,
    /// SQLite 输出路径（可选）
    pub sqlite_file: Option<PathBuf>,
    /// 全局汇总的投影字段，按给定顺序
    pub summary_fields: Vec<SummaryField>,
    /// 缓存根目录
    pub cache_root: PathBuf,
    /// 工作线程数
    pub thread_count: usize,
}

impl Config {
    /// 是否需要把结果送入归并线程（配置了任一输出即为真）
    pub fn do_summary(&self) -> bool {
        self.summary_file.is_some() || self.sqlite_file.is_some()
    }

    /// 默认工作线程数：可用核数减去保留核数，至少为 1
    pub fn default_thread_count() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .saturating_sub(RESERVED_CPUS)
            .max(1)
    }

    /// 验证配置的有效性
    ///
    /// SQLite 输出路径已存在属于前置条件错误：在任何工作开始之前就
    /// 拒绝运行，避免往旧数据上追加。
    pub fn validate(&self) -> Result<()> {
        if self.flow_dirs.is_empty() {
            return Err(FlowlogError::config("至少需要一个流日志根目录"));
        }

        if self.summary_fields.is_empty() {
            return Err(FlowlogError::config("汇总字段列表不能为空"));
        }

        if self.thread_count == 0 {
            return Err(FlowlogError::config("线程数不能为0"));
        }

        if let Some(sqlite_file) = &self.sqlite_file {
            if sqlite_file.exists() {
                return Err(FlowlogError::OutputExists(sqlite_file.clone()));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flow_dirs: Vec::new(),
            summary_file: None,
            sqlite_file: None,
            summary_fields: vec![SummaryField::Src, SummaryField::Dst],
            cache_root: PathBuf::from("cache"),
            thread_count: Self::default_thread_count(),
        }
    }
}
