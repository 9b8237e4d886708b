//! 流式归并线程
//!
//! 单独一个线程消费完成工件队列，把每份工件的键按配置的字段投影后折
//! 叠进全局汇总。全局汇总在整个运行期间只属于这个线程，流水线结束后
//! 通过 JoinHandle 移交给调用方，只读使用。

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{FlowlogError, Result};
use crate::flowlog::types::SummaryField;
use crate::flowlog::{FlowCache, cache};

/// 进度遥测的输出间隔
const STATUS_INTERVAL: Duration = Duration::from_millis(800);

/// 送入归并线程的消息
#[derive(Debug)]
pub enum ReduceMsg {
    /// 一份已完成的缓存工件（单文件或目录工件均可，处理方式一致）
    Artifact(PathBuf),
    /// 结束哨兵
    Finish,
}

/// 全局汇总：投影键到累计字节数
#[derive(Debug, Clone)]
pub struct GlobalSummary {
    /// 投影字段，按配置顺序
    pub fields: Vec<SummaryField>,
    /// 投影键到累计字节数
    pub keys: BTreeMap<Vec<String>, u64>,
    /// 归并过的数据行总数
    pub total_rows: u64,
    /// 归并过的工件数
    pub artifacts: u64,
}

impl GlobalSummary {
    /// 创建空汇总
    pub fn new(fields: Vec<SummaryField>) -> Self {
        Self { fields, keys: BTreeMap::new(), total_rows: 0, artifacts: 0 }
    }

    /// 投影字段名列表
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name().to_string()).collect()
    }

    /// 把一份缓存工件折叠进汇总
    pub fn fold(&mut self, flow_cache: &FlowCache) {
        for (raw_key, bytes) in &flow_cache.keys {
            let projected = raw_key.project(&self.fields);
            *self.keys.entry(projected).or_insert(0) += bytes;
        }
        self.total_rows += flow_cache.rows;
        self.artifacts += 1;
    }
}

/// 启动归并线程
///
/// 线程一直运行到收到 `Finish` 哨兵或通道关闭，随后把最终汇总通过
/// JoinHandle 返回。工件归并顺序不影响结果：字节求和满足交换律和结
/// 合律，且全程整数运算。
pub fn spawn_reducer(
    fields: Vec<SummaryField>,
    rx: Receiver<ReduceMsg>,
) -> thread::JoinHandle<Result<GlobalSummary>> {
    thread::spawn(move || {
        let mut summary = GlobalSummary::new(fields);
        let start = Instant::now();
        let mut last_status = start;

        while let Ok(msg) = rx.recv() {
            match msg {
                ReduceMsg::Artifact(path) => {
                    let flow_cache = cache::load(&path)?;
                    summary.fold(&flow_cache);

                    if last_status.elapsed() > STATUS_INTERVAL {
                        last_status = Instant::now();
                        let secs = start.elapsed().as_secs_f64();
                        tracing::info!(
                            "归并进度: {} 行 ({:.0} 行/秒), {} 个工件 ({:.1} 工件/秒), {} 个键",
                            summary.total_rows,
                            summary.total_rows as f64 / secs,
                            summary.artifacts,
                            summary.artifacts as f64 / secs,
                            summary.keys.len()
                        );
                    }
                }
                ReduceMsg::Finish => break,
            }
        }

        tracing::debug!(
            "归并线程结束: {} 个工件, {} 行, {} 个键",
            summary.artifacts,
            summary.total_rows,
            summary.keys.len()
        );
        Ok(summary)
    })
}

/// 等待归并线程结束并取回汇总
pub fn join_reducer(
    handle: thread::JoinHandle<Result<GlobalSummary>>,
) -> Result<GlobalSummary> {
    handle.join().map_err(|_| FlowlogError::worker("归并线程异常退出"))?
}
