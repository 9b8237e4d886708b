//! 流日志行提取器
//!
//! 逐行解析 gzip 压缩的流日志文件：首行是空白分隔的列名表头，其余行按
//! 表头定位字段，构造四元组键并累加字节数。同一文件内重复出现的键在
//! 这里就折叠为一个计数器。纯函数，无共享状态。

use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{FlowlogError, Result};
use crate::flowlog::types::{FlowCache, RawKey};

/// 必需的表头列
const REQUIRED_COLUMNS: [&str; 5] =
    ["account-id", "srcaddr", "dstaddr", "bytes", "protocol"];

/// 表头列到行内下标的映射
struct Columns {
    account: usize,
    /// `interface-id` 列可缺省，缺省时键的 interface 字段固定为 "0"
    interface: Option<usize>,
    src: usize,
    dst: usize,
    bytes: usize,
    protocol: usize,
}

impl Columns {
    fn from_header(header: &str, file: &Path) -> Result<Self> {
        let index: HashMap<&str, usize> = header
            .split_whitespace()
            .enumerate()
            .map(|(idx, name)| (name, idx))
            .collect();

        for column in REQUIRED_COLUMNS {
            if !index.contains_key(column) {
                return Err(FlowlogError::missing_column(file, column));
            }
        }

        Ok(Self {
            account: index["account-id"],
            interface: index.get("interface-id").copied(),
            src: index["srcaddr"],
            dst: index["dstaddr"],
            bytes: index["bytes"],
            protocol: index["protocol"],
        })
    }
}

/// 解析单个 gzip 压缩的流日志文件为缓存内容
///
/// 过滤规则：`srcaddr == "-"` 的行和 `protocol == "1"`（ICMP）的行被
/// 跳过，但仍计入总行数。任何解析失败（行太短、字节数非数字）对该文件
/// 是致命的，错误带上文件、行号和原始内容便于定位。
pub fn parse_flow_log(path: &Path) -> Result<FlowCache> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(GzDecoder::new(file));

    let mut header = String::new();
    reader.read_line(&mut header)?;
    let columns = Columns::from_header(&header, path)?;

    let mut cache = FlowCache::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        cache.rows += 1;

        let row: Vec<&str> = line.split_whitespace().collect();
        // 行号从 1 开始计，表头占第 1 行
        let malformed =
            || FlowlogError::malformed_row(path, line_no + 2, line.clone());

        let src = *row.get(columns.src).ok_or_else(malformed)?;
        if src == "-" {
            continue;
        }
        let protocol = *row.get(columns.protocol).ok_or_else(malformed)?;
        if protocol == "1" {
            // ICMP 不计入
            continue;
        }

        let dst = *row.get(columns.dst).ok_or_else(malformed)?;
        let account = *row.get(columns.account).ok_or_else(malformed)?;
        let interface = match columns.interface {
            Some(idx) => *row.get(idx).ok_or_else(malformed)?,
            None => "0",
        };
        let bytes: u64 = row
            .get(columns.bytes)
            .and_then(|v| v.parse().ok())
            .ok_or_else(malformed)?;

        cache.add(
            RawKey {
                account: account.to_string(),
                interface: interface.to_string(),
                src: src.to_string(),
                dst: dst.to_string(),
            },
            bytes,
        );
    }

    tracing::trace!(
        "解析完成: {} ({} 行, {} 个键)",
        path.display(),
        cache.rows,
        cache.keys.len()
    );
    Ok(cache)
}
