//! 目录级缓存合并
//!
//! 当一个目录的所有日志文件都已有单文件缓存时，把它们折叠为一份目录
//! 工件。之后的运行只需读这一份工件。合并在目录之间可并行，由工作线
//! 程池调度，和解析任务同等对待。

use std::path::Path;

use crate::error::Result;
use crate::flowlog::cache;
use crate::flowlog::types::FlowCache;

/// 把目录内所有单文件工件合并为一份目录工件并落盘
pub fn combine_folder<P: AsRef<Path>>(
    folder_cache: &Path,
    parts: &[P],
) -> Result<()> {
    let mut combined = FlowCache::default();
    let mut part_keys = 0usize;
    for part in parts {
        let part_cache = cache::load(part.as_ref())?;
        part_keys += part_cache.keys.len();
        combined.merge(&part_cache);
    }

    cache::store(folder_cache, &combined)?;
    tracing::debug!(
        "目录合并完成: {} ({} 个文件, {} -> {} 个键, {} 行)",
        folder_cache.display(),
        parts.len(),
        part_keys,
        combined.keys.len(),
        combined.rows
    );
    Ok(())
}
