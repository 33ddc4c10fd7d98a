use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// 路径大小缓存
///
/// 缓存只存在于内存中，由调用方持有并在多次批量分析之间共享。
/// 每条记录在对应路径完整计算结束后写入一次；不存在的记录表示 "尚未计算"，
/// 值为 0 的记录表示 "已计算，结果为空"。
///
/// 每次 `clear` 都会开启新的遍历代（generation），
/// 旧代的遍历在清空之后完成时，其写入会被丢弃。
#[derive(Debug, Default)]
pub struct SizeCache {
    entries: DashMap<PathBuf, u64>,

    /// 当前遍历代，写锁只在清空时持有
    generation: RwLock<u64>,
}

impl SizeCache {
    /// 创建空缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有的大小数据预填充缓存
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (PathBuf, u64)>,
    {
        let cache = Self::new();
        for (path, size) in entries {
            cache.entries.insert(path, size);
        }
        cache
    }

    /// 获取路径的缓存大小
    pub fn get(&self, path: &Path) -> Option<u64> {
        self.entries.get(path).map(|entry| *entry.value())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// 当前遍历代
    pub fn generation(&self) -> u64 {
        match self.generation.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// 写入当前代的大小
    pub fn insert(&self, path: PathBuf, size: u64) {
        let generation = self.generation();
        self.insert_for_generation(path, size, generation);
    }

    /// 写入指定代的大小，代已过期时丢弃并返回 false
    pub fn insert_for_generation(&self, path: PathBuf, size: u64, generation: u64) -> bool {
        let guard = match self.generation.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if *guard != generation {
            tracing::debug!("丢弃过期的缓存写入: {} (代 {} != {})", path.display(), generation, *guard);
            return false;
        }

        self.entries.insert(path, size);
        true
    }

    /// 移除单个路径的缓存（重新分析某个节点时使用）
    pub fn invalidate(&self, path: &Path) -> Option<u64> {
        self.entries.remove(path).map(|(_, size)| size)
    }

    /// 移除路径本身、其所有子路径以及祖先路径的缓存
    ///
    /// 祖先的大小包含该子树，因此同样失效。返回移除的条目数量。
    pub fn invalidate_subtree(&self, path: &Path) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| !key.starts_with(path) && !path.starts_with(key));
        before.saturating_sub(self.entries.len())
    }

    /// 清空缓存并开启新的遍历代
    pub fn clear(&self) -> u64 {
        let mut guard = match self.generation.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard += 1;
        self.entries.clear();
        *guard
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 导出当前缓存内容
    pub fn snapshot(&self) -> HashMap<PathBuf, u64> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}
