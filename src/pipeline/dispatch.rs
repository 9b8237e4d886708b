//! 扫描与调度循环
//!
//! 对每个根目录做后序深度遍历（先子目录后父目录），逐目录决定：
//! 重新解析个别文件、复用已有目录工件、从已缓存文件构建新目录工件、
//! 或把已缓存工件直接送入归并队列。任务提交到工作线程池，完成消息经
//! 完成通道回流；在途任务超过上限时调度循环阻塞在完成通道上，保证生
//! 产侧不会无限超前消费侧。

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use crate::config::Config;
use crate::error::Result;
use crate::flowlog::cache;
use crate::pipeline::pool::{Completion, Job, WorkerPool};
use crate::pipeline::reducer::ReduceMsg;

/// 流日志文件的扩展名
const LOG_EXTENSION: &str = "gz";

/// 在途任务上限的下限
const MIN_IN_FLIGHT: usize = 8;

/// 扫描统计
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanStats {
    /// 提交的解析任务数
    pub parse_jobs: usize,
    /// 提交的目录合并任务数
    pub combine_jobs: usize,
    /// 直接复用的目录工件数
    pub reused_folder_caches: usize,
    /// 失效删除的目录工件数
    pub invalidated_folder_caches: usize,
}

/// 任务调度器：跟踪在途任务并实施背压
struct Dispatcher<'a> {
    pool: &'a WorkerPool,
    reducer_tx: Sender<ReduceMsg>,
    do_summary: bool,
    /// 在途任务的工件路径集合，兼作防重复提交的检查
    pending: HashSet<PathBuf>,
    in_flight_limit: usize,
    stats: ScanStats,
}

impl<'a> Dispatcher<'a> {
    fn new(
        pool: &'a WorkerPool,
        reducer_tx: Sender<ReduceMsg>,
        do_summary: bool,
        thread_count: usize,
    ) -> Self {
        Self {
            pool,
            reducer_tx,
            do_summary,
            pending: HashSet::new(),
            in_flight_limit: (thread_count * 2).max(MIN_IN_FLIGHT),
            stats: ScanStats::default(),
        }
    }

    /// 提交任务；同一工件不会被提交两次
    fn submit(&mut self, job: Job) -> Result<()> {
        if self.pending.contains(job.artifact()) {
            return Ok(());
        }
        // 背压：在途任务到达上限时先等一个完成
        while self.pending.len() >= self.in_flight_limit {
            self.wait_one()?;
        }
        self.pending.insert(job.artifact().to_path_buf());
        self.pool.submit(job)
    }

    /// 阻塞处理一个完成消息
    ///
    /// 任务失败对整个流水线是致命的：静默跳过一个文件会让下游总数
    /// 失真，这里直接向上传播带完整上下文的错误。
    fn wait_one(&mut self) -> Result<()> {
        let Completion { artifact, result } = self.pool.recv_completion()?;
        self.pending.remove(&artifact);
        result?;
        self.forward(artifact);
        Ok(())
    }

    /// 把一份已完成的工件送入归并队列
    fn forward(&self, artifact: PathBuf) {
        if self.do_summary {
            // 归并线程提前退出时发送失败，错误会在别处浮出
            let _ = self.reducer_tx.send(ReduceMsg::Artifact(artifact));
        }
    }

    /// 等待所有在途任务完成
    fn drain(&mut self) -> Result<()> {
        while !self.pending.is_empty() {
            self.wait_one()?;
        }
        Ok(())
    }
}

/// 扫描所有根目录并调度整条流水线
///
/// 返回前会等待全部任务完成并向归并线程发送结束哨兵。
pub fn scan_and_dispatch(
    config: &Config,
    pool: &WorkerPool,
    reducer_tx: Sender<ReduceMsg>,
) -> Result<ScanStats> {
    let mut dispatcher = Dispatcher::new(
        pool,
        reducer_tx,
        config.do_summary(),
        config.thread_count,
    );

    for root in &config.flow_dirs {
        scan_dir(root, &config.cache_root, &mut dispatcher)?;
    }

    dispatcher.drain()?;
    let _ = dispatcher.reducer_tx.send(ReduceMsg::Finish);

    tracing::debug!(
        "扫描完成: {} 个解析任务, {} 个合并任务, 复用 {} 个目录工件, 失效 {} 个",
        dispatcher.stats.parse_jobs,
        dispatcher.stats.combine_jobs,
        dispatcher.stats.reused_folder_caches,
        dispatcher.stats.invalidated_folder_caches
    );
    Ok(dispatcher.stats)
}

/// 后序遍历单个目录
///
/// 先递归处理子目录，再对本目录的直接文件做缓存判定。目录工件只在
/// 本目录所有日志文件都已缓存时才有效；一旦发现未缓存的新文件，立即
/// 删除旧目录工件（失效规则）。
fn scan_dir(
    dir: &Path,
    cache_root: &Path,
    dispatcher: &mut Dispatcher<'_>,
) -> Result<()> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            subdirs.push(path);
        } else {
            files.push(path);
        }
    }
    subdirs.sort();
    files.sort();

    for subdir in &subdirs {
        scan_dir(subdir, cache_root, dispatcher)?;
    }

    let folder_cache = cache::folder_cache_path_for(cache_root, dir);
    let mut cached = Vec::new();
    let mut uncached = false;

    for logfile in &files {
        let cache_file = cache::cache_path_for(cache_root, logfile);
        if cache_file.exists() {
            cached.push(cache_file);
        } else if logfile
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(LOG_EXTENSION))
        {
            uncached = true;
            if folder_cache.exists() {
                // 目录里出现了未缓存的文件，旧目录工件不再可信
                tracing::info!("目录工件失效: {}", folder_cache.display());
                fs::remove_file(&folder_cache)?;
                dispatcher.stats.invalidated_folder_caches += 1;
            }
            dispatcher.stats.parse_jobs += 1;
            dispatcher.submit(Job::ParseLog {
                log_path: logfile.clone(),
                cache_path: cache_file,
            })?;
        }
    }

    if !cached.is_empty() && !uncached {
        if folder_cache.exists() {
            // 目录工件仍然有效，直接复用，不做任何重算
            dispatcher.stats.reused_folder_caches += 1;
            dispatcher.forward(folder_cache);
        } else {
            dispatcher.stats.combine_jobs += 1;
            dispatcher.submit(Job::CombineFolder {
                cache_path: folder_cache,
                parts: cached,
            })?;
        }
    } else if dispatcher.do_summary {
        // 目录尚不满足合并条件，已缓存的文件逐个送入归并队列
        for cache_file in cached {
            dispatcher.forward(cache_file);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowlog::SummaryField;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs::File;
    use std::io::Write;
    use std::sync::mpsc::channel;
    use tempfile::TempDir;

    const HEADER: &str = "account-id srcaddr dstaddr protocol bytes";

    fn write_gz_log(path: &Path, rows: &[&str]) {
        let mut encoder =
            GzEncoder::new(File::create(path).unwrap(), Compression::default());
        writeln!(encoder, "{HEADER}").unwrap();
        for row in rows {
            writeln!(encoder, "{row}").unwrap();
        }
        encoder.finish().unwrap();
    }

    fn test_config(root: &TempDir) -> Config {
        Config {
            flow_dirs: vec![root.path().join("logs")],
            summary_file: Some(root.path().join("summary.bin.gz")),
            sqlite_file: None,
            summary_fields: vec![SummaryField::Src, SummaryField::Dst],
            cache_root: root.path().join("cache"),
            thread_count: 2,
        }
    }

    fn run_scan(config: &Config) -> (ScanStats, Vec<ReduceMsg>) {
        let pool = WorkerPool::new(config.thread_count);
        let (tx, rx) = channel();
        let stats = scan_and_dispatch(config, &pool, tx).unwrap();
        pool.shutdown();
        (stats, rx.try_iter().collect())
    }

    #[test]
    fn test_first_run_parses_then_second_run_combines() {
        let root = TempDir::new().unwrap();
        let logs = root.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        write_gz_log(&logs.join("a.log.gz"), &["acct1 10.0.0.1 10.0.0.2 6 500"]);
        write_gz_log(&logs.join("b.log.gz"), &["acct1 10.0.0.1 10.0.0.2 6 300"]);

        let config = test_config(&root);

        // 第一轮：两个解析任务，目录工件尚未构建
        let (stats, _) = run_scan(&config);
        assert_eq!(stats.parse_jobs, 2);
        assert_eq!(stats.combine_jobs, 0);
        let folder_cache =
            cache::folder_cache_path_for(&config.cache_root, &logs);
        assert!(!folder_cache.exists());

        // 第二轮：全部已缓存，构建目录工件
        let (stats, _) = run_scan(&config);
        assert_eq!(stats.parse_jobs, 0);
        assert_eq!(stats.combine_jobs, 1);
        assert!(folder_cache.exists());

        let combined = cache::load(&folder_cache).unwrap();
        assert_eq!(combined.rows, 2);

        // 第三轮：直接复用目录工件
        let (stats, msgs) = run_scan(&config);
        assert_eq!(stats.combine_jobs, 0);
        assert_eq!(stats.reused_folder_caches, 1);
        let artifacts = msgs
            .iter()
            .filter(|m| matches!(m, ReduceMsg::Artifact(_)))
            .count();
        assert_eq!(artifacts, 1, "只应转发目录工件本身");
    }

    #[test]
    fn test_new_file_invalidates_folder_cache() {
        let root = TempDir::new().unwrap();
        let logs = root.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        write_gz_log(&logs.join("a.log.gz"), &["acct1 10.0.0.1 10.0.0.2 6 500"]);

        let config = test_config(&root);
        run_scan(&config);
        run_scan(&config);
        let folder_cache =
            cache::folder_cache_path_for(&config.cache_root, &logs);
        assert!(folder_cache.exists());

        // 新文件出现，旧目录工件必须立刻失效
        write_gz_log(&logs.join("b.log.gz"), &["acct1 10.0.0.1 10.0.0.2 6 300"]);
        let (stats, _) = run_scan(&config);
        assert_eq!(stats.invalidated_folder_caches, 1);
        assert_eq!(stats.parse_jobs, 1);
        assert!(!folder_cache.exists());

        // 再跑一轮，目录工件从全部文件（新旧）重建
        let (stats, _) = run_scan(&config);
        assert_eq!(stats.combine_jobs, 1);
        let combined = cache::load(&folder_cache).unwrap();
        assert_eq!(combined.rows, 2);
    }

    #[test]
    fn test_non_gz_files_are_ignored() {
        let root = TempDir::new().unwrap();
        let logs = root.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("readme.txt"), "not a log").unwrap();

        let config = test_config(&root);
        let (stats, msgs) = run_scan(&config);
        assert_eq!(stats.parse_jobs, 0);
        let artifacts = msgs
            .iter()
            .filter(|m| matches!(m, ReduceMsg::Artifact(_)))
            .count();
        assert_eq!(artifacts, 0);
    }

    #[test]
    fn test_malformed_file_is_pipeline_fatal() {
        let root = TempDir::new().unwrap();
        let logs = root.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        write_gz_log(
            &logs.join("bad.log.gz"),
            &["acct1 10.0.0.1 10.0.0.2 6 not-a-number"],
        );

        let config = test_config(&root);
        let pool = WorkerPool::new(1);
        let (tx, _rx) = channel();
        let result = scan_and_dispatch(&config, &pool, tx);
        pool.shutdown();
        assert!(result.unwrap_err().is_malformed_row());
    }

    #[test]
    fn test_summary_disabled_builds_caches_without_forwarding() {
        let root = TempDir::new().unwrap();
        let logs = root.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        write_gz_log(&logs.join("a.log.gz"), &["acct1 10.0.0.1 10.0.0.2 6 500"]);

        let mut config = test_config(&root);
        config.summary_file = None;
        assert!(!config.do_summary());

        let (stats, msgs) = run_scan(&config);
        assert_eq!(stats.parse_jobs, 1);
        let artifacts = msgs
            .iter()
            .filter(|m| matches!(m, ReduceMsg::Artifact(_)))
            .count();
        assert_eq!(artifacts, 0, "关闭汇总时不应转发任何工件");
        assert!(
            cache::cache_path_for(&config.cache_root, &logs.join("a.log.gz"))
                .exists(),
            "缓存构建本身不受影响"
        );
    }
}
