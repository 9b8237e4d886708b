//! 工作线程池
//!
//! 固定数量的线程共享一个任务队列，解析任务和目录合并任务同池调度。
//! 任务是纯函数：输入决定输出，任务之间没有共享可变状态，因此任务内
//! 部不需要加锁。每个任务完成后把完成消息推到完成通道，由调度循环消
//! 费，取代对任务句柄的轮询。

use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::error::{FlowlogError, Result};
use crate::flowlog::{cache, combine, parser};

/// 提交给线程池的任务
#[derive(Debug)]
pub enum Job {
    /// 解析单个日志文件并落盘单文件工件
    ParseLog { log_path: PathBuf, cache_path: PathBuf },
    /// 合并目录内的单文件工件为目录工件
    CombineFolder { cache_path: PathBuf, parts: Vec<PathBuf> },
}

impl Job {
    /// 任务产出的缓存工件路径
    pub fn artifact(&self) -> &Path {
        match self {
            Job::ParseLog { cache_path, .. } => cache_path,
            Job::CombineFolder { cache_path, .. } => cache_path,
        }
    }
}

/// 任务完成消息
#[derive(Debug)]
pub struct Completion {
    /// 任务产出的工件路径
    pub artifact: PathBuf,
    /// 任务执行结果
    pub result: Result<()>,
}

/// 固定大小的工作线程池
pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    completion_rx: Receiver<Completion>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// 启动 `workers` 个工作线程
    pub fn new(workers: usize) -> Self {
        let (job_tx, job_rx) = channel::<Job>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (completion_tx, completion_rx) = channel::<Completion>();

        let workers = workers.max(1);
        tracing::debug!("启动 {} 个工作线程", workers);

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let completion_tx = completion_tx.clone();

            let handle = thread::spawn(move || {
                tracing::trace!("工作线程 {} 启动", worker_id);
                loop {
                    // 取任务时短暂持锁，执行时不持锁
                    let job = { job_rx.lock().unwrap().recv() };
                    let Ok(job) = job else {
                        // 队列关闭，线程退出
                        break;
                    };

                    let artifact = job.artifact().to_path_buf();
                    let result = run_job(job);
                    if completion_tx
                        .send(Completion { artifact, result })
                        .is_err()
                    {
                        break;
                    }
                }
                tracing::trace!("工作线程 {} 退出", worker_id);
            });

            handles.push(handle);
        }

        Self { job_tx: Some(job_tx), completion_rx, handles }
    }

    /// 提交一个任务
    pub fn submit(&self, job: Job) -> Result<()> {
        let tx = self
            .job_tx
            .as_ref()
            .ok_or_else(|| FlowlogError::worker("任务队列已关闭"))?;
        tx.send(job).map_err(|_| FlowlogError::worker("任务队列已关闭"))
    }

    /// 阻塞等待下一个完成消息
    pub fn recv_completion(&self) -> Result<Completion> {
        self.completion_rx
            .recv()
            .map_err(|_| FlowlogError::worker("所有工作线程已退出"))
    }

    /// 关闭任务队列并等待所有工作线程退出
    pub fn shutdown(mut self) {
        self.job_tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// 执行单个任务
fn run_job(job: Job) -> Result<()> {
    match job {
        Job::ParseLog { log_path, cache_path } => {
            let parsed = parser::parse_flow_log(&log_path)?;
            cache::store(&cache_path, &parsed)
        }
        Job::CombineFolder { cache_path, parts } => {
            combine::combine_folder(&cache_path, &parts)
        }
    }
}
