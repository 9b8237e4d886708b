//! 汇总结果导出器
//!
//! 两个互相独立的出口：排序的扁平汇总文件和 SQLite 表。归并线程结束
//! 后，任一或两者都可以运行，输入是只读的全局汇总。

pub mod sqlite;
pub mod summary_file;

use crate::error::Result;
use crate::pipeline::reducer::GlobalSummary;

/// 汇总导出器的统一接口
pub trait SummaryExporter {
    /// 导出器名称（用于日志）
    fn name(&self) -> &str;

    /// 导出完整的全局汇总
    fn export(&mut self, summary: &GlobalSummary) -> Result<()>;
}
