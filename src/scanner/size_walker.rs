use futures::future::join_all;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;

use crate::scanner::ignore::IgnoreMatcher;
use crate::scanner::limiter::ConcurrencyLimiter;
use crate::scanner::size_cache::SizeCache;

/// 大小遍历器 - 递归计算单个文件系统条目的字节数
///
/// 只有元数据读取和列目录会占用限制器槽位，递归和求和不受限制。
/// 子条目的任何错误都在本层吞掉并按 0 计入，不会中断整棵树的遍历。
pub struct SizeWalker<'a> {
    ignore: &'a IgnoreMatcher,
    cache: &'a SizeCache,
    limiter: &'a ConcurrencyLimiter,

    /// 遍历开始时的缓存代
    generation: u64,
}

impl<'a> SizeWalker<'a> {
    pub fn new(ignore: &'a IgnoreMatcher, cache: &'a SizeCache, limiter: &'a ConcurrencyLimiter) -> Self {
        Self {
            ignore,
            cache,
            limiter,
            generation: cache.generation(),
        }
    }

    /// 计算路径的递归大小
    pub fn compute_size<'b>(&'b self, path: &'b Path) -> Pin<Box<dyn Future<Output = u64> + Send + 'b>> {
        Box::pin(async move {
            if let Some(size) = self.cache.get(path) {
                return size;
            }

            // 被忽略的子树不会被列出
            if self.ignore.is_ignored(path) {
                self.record(path, 0);
                return 0;
            }

            let metadata = match self.limiter.run(fs::symlink_metadata(path)).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::debug!("读取元数据失败 {}: {}", path.display(), e);
                    self.record(path, 0);
                    return 0;
                }
            };

            let file_type = metadata.file_type();

            // 符号链接按 0 计算，避免循环和重复计数
            if file_type.is_symlink() {
                self.record(path, 0);
                return 0;
            }

            if file_type.is_file() {
                let size = metadata.len();
                self.record(path, size);
                return size;
            }

            if file_type.is_dir() {
                let children = match self.limiter.run(list_children(path)).await {
                    Ok(children) => children,
                    Err(e) => {
                        tracing::debug!("读取目录失败 {}: {}", path.display(), e);
                        self.record(path, 0);
                        return 0;
                    }
                };

                // 子条目并发计算，全部完成后再汇总
                let sizes = join_all(children.iter().map(|child| self.compute_size(child))).await;
                let total: u64 = sizes.iter().sum();

                self.record(path, total);
                return total;
            }

            // 设备、套接字等其他类型
            0
        })
    }

    fn record(&self, path: &Path, size: u64) {
        self.cache.insert_for_generation(path.to_path_buf(), size, self.generation);
    }
}

/// 列出目录的直接子条目
async fn list_children(dir_path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    let mut entries = fs::read_dir(dir_path).await?;

    while let Some(entry) = entries.next_entry().await? {
        children.push(entry.path());
    }

    Ok(children)
}

/// 使用给定的忽略规则、缓存和限制器计算路径大小
pub async fn compute_size(
    path: &Path,
    ignore: &IgnoreMatcher,
    cache: &SizeCache,
    limiter: &ConcurrencyLimiter,
) -> u64 {
    SizeWalker::new(ignore, cache, limiter).compute_size(path).await
}
