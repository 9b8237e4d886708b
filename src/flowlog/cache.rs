//! 缓存工件的读写
//!
//! 缓存目录镜像输入目录结构：单文件工件位于 `<cache_root>/<原路径>`，
//! 目录工件位于 `<cache_root>/<原目录路径>.folder`。工件内容是 gzip
//! 压缩的 bincode 序列化 `FlowCache`。
//!
//! 写入采用临时文件加原子改名：读者永远不会看到半写的工件，进程在写
//! 入途中被杀死也只会留下一个孤立的 `.tmp` 文件。工件一旦存在即被信
//! 任，不做 mtime 或内容哈希比对（见 DESIGN.md 的开放问题记录）。

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};

use crate::error::Result;
use crate::flowlog::types::FlowCache;

/// 目录工件的路径后缀
const FOLDER_SUFFIX: &str = ".folder";

/// 把输入路径映射到缓存根下的镜像路径
///
/// 绝对路径会先剥掉根前缀再拼接，避免 `join` 被绝对路径整体替换。
fn mirror_path(cache_root: &Path, path: &Path) -> PathBuf {
    let relative: PathBuf = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    cache_root.join(relative)
}

/// 单个日志文件对应的缓存工件路径
pub fn cache_path_for(cache_root: &Path, log_path: &Path) -> PathBuf {
    mirror_path(cache_root, log_path)
}

/// 目录对应的缓存工件路径（目录镜像路径加 `.folder` 后缀）
pub fn folder_cache_path_for(cache_root: &Path, dir: &Path) -> PathBuf {
    let mut path = mirror_path(cache_root, dir).into_os_string();
    path.push(FOLDER_SUFFIX);
    PathBuf::from(path)
}

/// 原子写入缓存工件
///
/// 先写 `<path>.tmp` 再改名到最终路径。同一内容重复写入产生字节级一致
/// 的工件（BTreeMap 序列化顺序确定，gzip 头不含时间戳）。
pub fn store(path: &Path, cache: &FlowCache) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path_for(path);
    let writer = BufWriter::new(File::create(&tmp_path)?);
    let mut encoder = GzEncoder::new(writer, Compression::default());
    bincode::serialize_into(&mut encoder, cache)?;
    encoder.finish()?;

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// 读取缓存工件
pub fn load(path: &Path) -> Result<FlowCache> {
    let reader = BufReader::new(File::open(path)?);
    let cache = bincode::deserialize_from(GzDecoder::new(reader))?;
    Ok(cache)
}

/// 工件对应的临时写入路径
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf().into_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
