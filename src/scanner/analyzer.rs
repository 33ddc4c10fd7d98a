use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio_util::sync::CancellationToken;

use crate::models::{ChildSize, FolderSizeResult, RootError};
use crate::scanner::ignore::IgnoreMatcher;
use crate::scanner::limiter::{ConcurrencyLimiter, DEFAULT_CONCURRENCY_LIMIT};
use crate::scanner::size_cache::SizeCache;
use crate::scanner::size_walker::SizeWalker;
use crate::utils::size_format::{format_bytes_with, DEFAULT_DECIMALS};

/// 图表默认展示的子项数量
pub const DEFAULT_TOP_CHILDREN: usize = 15;

/// 批量分析选项
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// 忽略规则（绝对路径 glob）
    pub ignore: Vec<String>,

    /// 同时进行的文件系统操作上限
    pub concurrency_limit: usize,

    /// 大小显示的小数位数
    pub decimals: usize,

    /// 外部持有的缓存，为空时每次调用使用新缓存
    pub cache: Option<Arc<SizeCache>>,

    /// 协作式取消信号，仅在开始每个根路径前检查
    pub cancel: Option<CancellationToken>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            decimals: DEFAULT_DECIMALS,
            cache: None,
            cancel: None,
        }
    }
}

impl AnalyzeOptions {
    pub fn with_ignore<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.ignore = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_cache(mut self, cache: Arc<SizeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|c| c.is_cancelled()).unwrap_or(false)
    }
}

/// 批量分析多个根路径
///
/// 结果与输入一一对应、顺序一致。单个根路径失败不会影响其他根路径；
/// 取消后尚未开始的根路径以 `RootError::Cancelled` 返回。
pub async fn analyze_folders<P: AsRef<Path>>(roots: &[P], options: &AnalyzeOptions) -> Vec<FolderSizeResult> {
    let cache = options.cache.clone().unwrap_or_default();
    let ignore = IgnoreMatcher::new(&options.ignore);

    // 整个批次共享一个限制器
    let limiter = ConcurrencyLimiter::new(options.concurrency_limit);

    tracing::info!(
        "开始分析 {} 个路径 (并发限制 {}, 忽略规则 {} 条)",
        roots.len(),
        limiter.limit(),
        ignore.patterns().len()
    );

    let mut results = Vec::with_capacity(roots.len());

    for root in roots {
        let root = root.as_ref();

        if options.is_cancelled() {
            tracing::info!("分析已取消，跳过 {}", root.display());
            results.push(FolderSizeResult::failure(root, RootError::Cancelled));
            continue;
        }

        results.push(analyze_root(root, &ignore, &cache, &limiter, options.decimals).await);
    }

    tracing::info!("分析完成，共 {} 个结果", results.len());
    results
}

/// 分析单个根路径
async fn analyze_root(
    root: &Path,
    ignore: &IgnoreMatcher,
    cache: &SizeCache,
    limiter: &ConcurrencyLimiter,
    decimals: usize,
) -> FolderSizeResult {
    if let Err(e) = fs::metadata(root).await {
        let error = RootError::from(e);
        if error != RootError::NotFound {
            tracing::warn!("无法访问 {}: {}", root.display(), error);
        }
        return FolderSizeResult::failure(root, error);
    }

    let size = SizeWalker::new(ignore, cache, limiter).compute_size(root).await;
    tracing::debug!("{} -> {} 字节", root.display(), size);

    FolderSizeResult::success(root, size, decimals)
}

/// 计算目录下最大的子项（图表数据）
///
/// 默认跳过隐藏条目；已缓存的子项直接复用，其余的批量分析后写入缓存。
/// 结果去掉大小为 0 的条目，按大小降序排列并保留前 `limit` 个。
pub async fn analyze_children(
    dir_path: &Path,
    options: &AnalyzeOptions,
    limit: usize,
    include_hidden: bool,
) -> anyhow::Result<Vec<ChildSize>> {
    let cache = options.cache.clone().unwrap_or_default();

    let mut children = Vec::new();
    let mut entries = fs::read_dir(dir_path).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !include_hidden && entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        children.push(entry.path());
    }

    let missing: Vec<PathBuf> = children
        .iter()
        .filter(|child| !cache.contains(child))
        .cloned()
        .collect();

    if !missing.is_empty() {
        let child_options = AnalyzeOptions {
            cache: Some(cache.clone()),
            ..options.clone()
        };
        analyze_folders(&missing, &child_options).await;
    }

    let mut sizes: Vec<ChildSize> = children
        .into_iter()
        .filter_map(|path| {
            let size = cache.get(&path).unwrap_or(0);
            if size == 0 {
                return None;
            }
            Some(ChildSize {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                formatted_size: format_bytes_with(size, options.decimals),
                path,
                size,
            })
        })
        .collect();

    sizes.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
    sizes.truncate(limit);

    Ok(sizes)
}

/// 列出工作区根目录下的非隐藏子目录
///
/// `target_folders` 非空时只保留名称在列表中的目录。
pub async fn workspace_folders(root: &Path, target_folders: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    let mut entries = fs::read_dir(root).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        if !target_folders.is_empty() && !target_folders.contains(&name) {
            continue;
        }
        folders.push(entry.path());
    }

    folders.sort();
    Ok(folders)
}

/// 为每个顶层目录生成锚定到绝对路径的忽略规则 (`<root>/<dir>/**`)
pub async fn anchored_ignore_patterns(root: &Path) -> anyhow::Result<Vec<String>> {
    let folders = workspace_folders(root, &[]).await?;

    Ok(folders
        .iter()
        .map(|folder| format!("{}/**", crate::scanner::ignore::normalize_path(folder)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::tempdir;

    fn build_sample_tree(root: &Path) {
        std_fs::create_dir(root.join("a")).unwrap();
        std_fs::write(root.join("a").join("x"), vec![0u8; 100]).unwrap();
        std_fs::write(root.join("a").join("y"), vec![0u8; 924]).unwrap();
        std_fs::write(root.join("b"), vec![0u8; 1024]).unwrap();
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let temp_dir = tempdir().unwrap();
        build_sample_tree(temp_dir.path());

        let roots = vec![
            temp_dir.path().join("b"),
            temp_dir.path().join("missing"),
            temp_dir.path().join("a"),
            temp_dir.path().to_path_buf(),
        ];

        let results = analyze_folders(&roots, &AnalyzeOptions::default()).await;

        assert_eq!(results.len(), 4);
        for (result, root) in results.iter().zip(&roots) {
            assert_eq!(&result.path, root);
        }
        assert_eq!(results[0].size, 1024);
        assert_eq!(results[1].error, Some(RootError::NotFound));
        assert_eq!(results[2].formatted_size, "1 KB");
        assert_eq!(results[3].size, 2048);
        assert_eq!(results[3].formatted_size, "2 KB");
    }

    #[tokio::test]
    async fn test_missing_root() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("node_modules");

        let results = analyze_folders(&[&missing], &AnalyzeOptions::default()).await;

        assert_eq!(
            results,
            vec![FolderSizeResult {
                path: missing.clone(),
                size: 0,
                formatted_size: "0 Bytes".to_string(),
                error: Some(RootError::NotFound),
            }]
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let temp_dir = tempdir().unwrap();
        build_sample_tree(temp_dir.path());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let options = AnalyzeOptions::default().with_cancel(cancel);
        let results = analyze_folders(&[temp_dir.path()], &options).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].error, Some(RootError::Cancelled));
        assert_eq!(results[0].size, 0);
    }

    #[tokio::test]
    async fn test_shared_cache_is_populated() {
        let temp_dir = tempdir().unwrap();
        build_sample_tree(temp_dir.path());
        let cache = Arc::new(SizeCache::new());

        let options = AnalyzeOptions::default().with_cache(cache.clone());
        analyze_folders(&[temp_dir.path()], &options).await;

        assert_eq!(cache.get(temp_dir.path()), Some(2048));
        assert_eq!(cache.get(&temp_dir.path().join("b")), Some(1024));
    }

    #[tokio::test]
    async fn test_analyze_children_top_list() {
        let temp_dir = tempdir().unwrap();
        build_sample_tree(temp_dir.path());
        std_fs::write(temp_dir.path().join("small"), vec![0u8; 10]).unwrap();
        std_fs::write(temp_dir.path().join(".hidden"), vec![0u8; 5000]).unwrap();
        std_fs::create_dir(temp_dir.path().join("empty")).unwrap();

        let children = analyze_children(temp_dir.path(), &AnalyzeOptions::default(), 2, false).await.unwrap();

        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(children.iter().all(|c| c.size == 1024));

        let with_hidden = analyze_children(temp_dir.path(), &AnalyzeOptions::default(), 1, true).await.unwrap();
        assert_eq!(with_hidden[0].name, ".hidden");
        assert_eq!(with_hidden[0].formatted_size, "4.88 KB");
    }

    #[tokio::test]
    async fn test_workspace_folders_filter() {
        let temp_dir = tempdir().unwrap();
        for name in ["node_modules", "dist", "src", ".git"] {
            std_fs::create_dir(temp_dir.path().join(name)).unwrap();
        }
        std_fs::write(temp_dir.path().join("build"), "not a dir").unwrap();

        let all = workspace_folders(temp_dir.path(), &[]).await.unwrap();
        assert_eq!(all.len(), 3);

        let targets = vec!["node_modules".to_string(), "build".to_string()];
        let filtered = workspace_folders(temp_dir.path(), &targets).await.unwrap();
        assert_eq!(filtered, vec![temp_dir.path().join("node_modules")]);
    }

    #[tokio::test]
    async fn test_anchored_ignore_patterns() {
        let temp_dir = tempdir().unwrap();
        build_sample_tree(temp_dir.path());

        let patterns = anchored_ignore_patterns(temp_dir.path()).await.unwrap();
        let root = crate::scanner::ignore::normalize_path(temp_dir.path());

        assert_eq!(patterns, vec![format!("{}/a/**", root)]);

        // 生成的规则可以直接用于分析
        let options = AnalyzeOptions::default().with_ignore(patterns);
        let results = analyze_folders(&[temp_dir.path()], &options).await;
        assert_eq!(results[0].size, 1024);
    }
}
