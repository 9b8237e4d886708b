use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{FlowlogError, Result};

/// 流日志四元组键
///
/// 字段顺序固定为 `(account, interface, src, dst)`。当源日志没有
/// `interface-id` 列时，`interface` 固定为 `"0"`。
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct RawKey {
    /// 账户 ID
    pub account: String,
    /// 网络接口 ID，缺省为 "0"
    pub interface: String,
    /// 源地址
    pub src: String,
    /// 目的地址
    pub dst: String,
}

impl RawKey {
    /// 按给定字段列表投影为汇总键
    pub fn project(&self, fields: &[SummaryField]) -> Vec<String> {
        fields
            .iter()
            .map(|f| match f {
                SummaryField::Interface => self.interface.clone(),
                SummaryField::Account => self.account.clone(),
                SummaryField::Src => self.src.clone(),
                SummaryField::Dst => self.dst.clone(),
            })
            .collect()
    }
}

/// 汇总键字段
///
/// `RawKey` 的四个字段的子集（可任意排序）构成全局汇总的键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryField {
    Interface,
    Account,
    Src,
    Dst,
}

impl SummaryField {
    /// 字段名（同时用作 SQLite 列名）
    pub fn name(self) -> &'static str {
        match self {
            SummaryField::Interface => "interface",
            SummaryField::Account => "account",
            SummaryField::Src => "src",
            SummaryField::Dst => "dst",
        }
    }

    /// 解析逗号分隔的字段列表，例如 `"src,dst"`
    ///
    /// 保留调用方给定的顺序，忽略重复项；未知字段名或空列表返回配置错误。
    pub fn parse_list(s: &str) -> Result<Vec<SummaryField>> {
        let mut fields = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let field = match part {
                "interface" => SummaryField::Interface,
                "account" => SummaryField::Account,
                "src" => SummaryField::Src,
                "dst" => SummaryField::Dst,
                other => {
                    return Err(FlowlogError::config(format!(
                        "无效的汇总字段: {other}"
                    )));
                }
            };
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        if fields.is_empty() {
            return Err(FlowlogError::config("汇总字段列表不能为空"));
        }
        Ok(fields)
    }
}

/// 缓存工件的内容：键到字节数的映射加总行数
///
/// 单文件缓存和目录缓存共用这一结构。键用 `BTreeMap` 保证序列化顺序
/// 确定，同一内容重复落盘时字节级一致。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowCache {
    /// 四元组键到累计字节数
    pub keys: BTreeMap<RawKey, u64>,
    /// 源文件的数据行总数（含被过滤的行）
    pub rows: u64,
}

impl FlowCache {
    /// 向累加器添加一条记录，键冲突时字节数相加
    pub fn add(&mut self, key: RawKey, bytes: u64) {
        *self.keys.entry(key).or_insert(0) += bytes;
    }

    /// 合并另一份缓存，键冲突时字节数相加，行数累加
    pub fn merge(&mut self, other: &FlowCache) {
        for (key, bytes) in &other.keys {
            *self.keys.entry(key.clone()).or_insert(0) += bytes;
        }
        self.rows += other.rows;
    }
}
