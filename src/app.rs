//! 应用入口：把各阶段串成完整流水线
//!
//! 校验配置、启动归并线程和工作线程池、扫描调度、等待收尾，最后按配
//! 置运行导出器。每个阶段的耗时收集进运行报告。

use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::Result;
use crate::exporter::sqlite::SqliteExporter;
use crate::exporter::summary_file::SummaryFileExporter;
use crate::exporter::SummaryExporter;
use crate::pipeline::dispatch::{ScanStats, scan_and_dispatch};
use crate::pipeline::pool::WorkerPool;
use crate::pipeline::reducer::{GlobalSummary, join_reducer, spawn_reducer};

/// 一次流水线运行的报告
#[derive(Debug)]
pub struct RunReport {
    /// 扫描与解析阶段耗时（含等待所有任务完成）
    pub scan_elapsed: Duration,
    /// 汇总文件写入耗时
    pub summary_elapsed: Option<Duration>,
    /// SQLite 写入耗时
    pub sqlite_elapsed: Option<Duration>,
    /// 扫描统计
    pub scan_stats: ScanStats,
    /// 最终的全局汇总
    pub summary: GlobalSummary,
}

/// 运行完整流水线
pub fn run(config: &Config) -> Result<RunReport> {
    config.validate()?;

    // 归并线程独占全局汇总，其他组件只通过消息与之交互
    let (reducer_tx, reducer_rx) = channel();
    let reducer_handle =
        spawn_reducer(config.summary_fields.clone(), reducer_rx);

    let pool = WorkerPool::new(config.thread_count);

    let scan_start = Instant::now();
    let scan_result = scan_and_dispatch(config, &pool, reducer_tx);
    let scan_elapsed = scan_start.elapsed();

    // 无论扫描是否出错都先回收线程：出错时调度侧的发送端已关闭，
    // 归并线程会随通道关闭自然退出
    pool.shutdown();
    let summary = join_reducer(reducer_handle)?;
    let scan_stats = scan_result?;

    tracing::info!(
        "扫描阶段完成: 耗时 {:.2?}, {} 个解析任务, {} 个合并任务, \
         复用 {} 个目录工件, 归并 {} 行 / {} 个键",
        scan_elapsed,
        scan_stats.parse_jobs,
        scan_stats.combine_jobs,
        scan_stats.reused_folder_caches,
        summary.total_rows,
        summary.keys.len()
    );

    let mut summary_elapsed = None;
    if let Some(summary_file) = &config.summary_file {
        let start = Instant::now();
        SummaryFileExporter::new(summary_file).export(&summary)?;
        summary_elapsed = Some(start.elapsed());
    }

    let mut sqlite_elapsed = None;
    if let Some(sqlite_file) = &config.sqlite_file {
        let start = Instant::now();
        SqliteExporter::create(sqlite_file)?.export(&summary)?;
        sqlite_elapsed = Some(start.elapsed());
    }

    let report = RunReport {
        scan_elapsed,
        summary_elapsed,
        sqlite_elapsed,
        scan_stats,
        summary,
    };

    if let Some(elapsed) = report.summary_elapsed {
        tracing::info!("汇总文件阶段耗时: {elapsed:.2?}");
    }
    if let Some(elapsed) = report.sqlite_elapsed {
        tracing::info!("SQLite阶段耗时: {elapsed:.2?}");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowlog::SummaryField;
    use std::path::PathBuf;

    #[test]
    fn test_run_rejects_invalid_config() {
        let config = Config { flow_dirs: Vec::new(), ..Config::default() };
        assert!(run(&config).unwrap_err().is_config_error());
    }

    #[test]
    fn test_run_rejects_existing_sqlite_target_before_any_work() {
        let dir = tempfile::TempDir::new().unwrap();
        let existing = dir.path().join("flow.sqlite");
        std::fs::write(&existing, b"stale").unwrap();

        let config = Config {
            flow_dirs: vec![PathBuf::from("does-not-matter")],
            sqlite_file: Some(existing),
            summary_fields: vec![SummaryField::Src, SummaryField::Dst],
            ..Config::default()
        };
        assert!(run(&config).unwrap_err().is_output_exists());
    }
}
