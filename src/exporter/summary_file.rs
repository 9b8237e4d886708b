//! 扁平汇总文件导出器
//!
//! 工件格式：gzip 压缩的 bincode 流，第一条记录是投影字段名列表，第
//! 二条是按键排序的 `(拼接键, 字节数)` 记录表。写入同样走临时文件加
//! 原子改名。

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::SummaryExporter;
use crate::error::Result;
use crate::flowlog::cache;
use crate::pipeline::reducer::GlobalSummary;

/// 扁平汇总文件导出器
pub struct SummaryFileExporter {
    out_path: PathBuf,
}

impl SummaryFileExporter {
    /// 创建导出器
    pub fn new(out_path: &Path) -> Self {
        Self { out_path: out_path.to_path_buf() }
    }
}

impl SummaryExporter for SummaryFileExporter {
    fn name(&self) -> &str {
        "summary-file"
    }

    fn export(&mut self, summary: &GlobalSummary) -> Result<()> {
        let tmp_path = cache::tmp_path_for(&self.out_path);
        if let Some(parent) = self.out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let writer = BufWriter::new(File::create(&tmp_path)?);
        let mut encoder = GzEncoder::new(writer, Compression::default());

        // 首条记录：投影字段名，随后是按键排序的记录表
        bincode::serialize_into(&mut encoder, &summary.field_names())?;
        let entries: Vec<(String, u64)> = summary
            .keys
            .iter()
            .map(|(key, bytes)| (key.join(" "), *bytes))
            .collect();
        bincode::serialize_into(&mut encoder, &entries)?;
        encoder.finish()?;

        fs::rename(&tmp_path, &self.out_path)?;
        tracing::info!(
            "汇总文件写入完成: {} ({} 个键)",
            self.out_path.display(),
            entries.len()
        );
        Ok(())
    }
}

/// 读取扁平汇总文件，返回字段名和排序的记录表
///
/// 下游的探索工具按这一格式消费汇总工件。
pub fn read_summary_file(path: &Path) -> Result<(Vec<String>, Vec<(String, u64)>)> {
    let reader = BufReader::new(File::open(path)?);
    let mut decoder = GzDecoder::new(reader);
    let fields: Vec<String> = bincode::deserialize_from(&mut decoder)?;
    let entries: Vec<(String, u64)> = bincode::deserialize_from(&mut decoder)?;
    Ok((fields, entries))
}
