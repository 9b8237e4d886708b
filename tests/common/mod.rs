//! 集成测试公共模块

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 含 interface-id 列的标准表头
#[allow(dead_code)]
pub const FULL_HEADER: &str =
    "account-id interface-id srcaddr dstaddr protocol bytes";

/// 不含 interface-id 列的表头
#[allow(dead_code)]
pub const NO_INTERFACE_HEADER: &str =
    "account-id srcaddr dstaddr protocol bytes";

/// 写入一个 gzip 压缩的流日志文件
pub fn write_flow_log(path: &Path, header: &str, rows: &[&str]) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create log dir");
    }
    let mut encoder = GzEncoder::new(
        File::create(path).expect("create log file"),
        Compression::default(),
    );
    writeln!(encoder, "{header}").expect("write header");
    for row in rows {
        writeln!(encoder, "{row}").expect("write row");
    }
    encoder.finish().expect("finish gzip");
    path.to_path_buf()
}
