use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// 默认并发限制
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 8;

/// 并发限制器 - 限制同时进行的文件系统元数据/列目录操作数量
///
/// 只包裹真正发起系统调用的步骤，递归本身不受限制。
/// 等待的操作按 FIFO 顺序获得槽位。
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
    stats: Arc<LimiterStats>,
}

#[derive(Default)]
struct LimiterStats {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyLimiter {
    /// 创建限制器，最小为 1
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            stats: Arc::new(LimiterStats::default()),
        }
    }

    /// 在占用一个槽位的情况下执行 I/O 操作
    pub async fn run<F, T>(&self, op: F) -> io::Result<T>
    where
        F: Future<Output = io::Result<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        let current = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(current, Ordering::SeqCst);

        let result = op.await;

        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 当前正在执行的操作数量
    pub fn in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::SeqCst)
    }

    /// 历史最大并发操作数量
    pub fn peak_in_flight(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY_LIMIT)
    }
}
