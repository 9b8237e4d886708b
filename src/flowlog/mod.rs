//! 流日志领域模块：键与缓存类型、行提取器、缓存工件读写、目录合并

pub mod cache;
pub mod combine;
pub mod parser;
pub mod types;

pub use types::{FlowCache, RawKey, SummaryField};
