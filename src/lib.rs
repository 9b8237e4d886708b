//! flowlog-analysis - AWS VPC 流日志的并行解析、缓存与聚合工具库
//!
//! 流水线：目录扫描 → 并行解析单文件 → 单文件缓存 → 目录级缓存合并
//! → 完成队列 → 流式归并 → 全局汇总 → 导出（汇总文件 / SQLite）。

// 核心模块
pub mod error;
pub mod flowlog;

// 流水线
pub mod pipeline;

// 导出模块
pub mod exporter;

// 外围：配置、日志、应用入口
pub mod app;
pub mod config;
pub mod logging;
