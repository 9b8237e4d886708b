//! 并行流水线：工作线程池、扫描调度循环、流式归并线程

pub mod dispatch;
pub mod pool;
pub mod reducer;

pub use dispatch::{ScanStats, scan_and_dispatch};
pub use pool::{Completion, Job, WorkerPool};
pub use reducer::{GlobalSummary, ReduceMsg, join_reducer, spawn_reducer};
