use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use flowlog_analysis::app;
use flowlog_analysis::config::Config;
use flowlog_analysis::flowlog::SummaryField;
use flowlog_analysis::logging;

/// 解析并聚合 AWS VPC 流日志
#[derive(Debug, Parser)]
#[command(name = "flowlog-cli", version)]
struct Cli {
    /// 流日志根目录（可指定多个）
    #[arg(required = true)]
    flowdir: Vec<PathBuf>,

    /// 汇总文件输出路径
    #[arg(long)]
    summary_file: Option<PathBuf>,

    /// SQLite 输出路径（目标文件已存在时拒绝运行）
    #[arg(long)]
    sqlite_file: Option<PathBuf>,

    /// 汇总键字段，逗号分隔（interface/account/src/dst 的子集）
    #[arg(long, default_value = "src,dst")]
    summary_fields: String,

    /// 缓存根目录
    #[arg(long, default_value = "cache")]
    flowcache: PathBuf,

    /// 工作线程数（默认：可用核数减 2）
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    logging::init_default_logging()?;
    let cli = Cli::parse();

    let config = Config {
        flow_dirs: cli.flowdir,
        summary_file: cli.summary_file,
        sqlite_file: cli.sqlite_file,
        summary_fields: SummaryField::parse_list(&cli.summary_fields)?,
        cache_root: cli.flowcache,
        thread_count: cli.threads.unwrap_or_else(Config::default_thread_count),
    };

    let report = app::run(&config)?;
    println!(
        "聚合完成，共归并 {} 个工件，{} 条数据行，{} 个汇总键，扫描耗时 {:.2?}。",
        report.summary.artifacts,
        report.summary.total_rows,
        report.summary.keys.len(),
        report.scan_elapsed
    );
    Ok(())
}
