use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::{load_ignore_file, merge_patterns, Settings};
use crate::models::{AnalysisSummary, ChildSize, FolderSizeResult, RootError};
use crate::scanner::analyzer::{analyze_children, analyze_folders, workspace_folders, AnalyzeOptions};
use crate::scanner::size_cache::SizeCache;

/// 正在进行的单路径计算，可被多个请求方同时等待
pub type SizeRequest = Shared<BoxFuture<'static, FolderSizeResult>>;

struct InFlight {
    ticket: u64,
    request: SizeRequest,
}

/// 大小分析会话 - 一个工作区共享的上下文
///
/// 持有共享的大小缓存、当前生效的忽略规则和正在进行的计算登记表。
/// 同一路径的并发请求只会触发一次计算：第一个请求方启动计算，
/// 之后的请求方附加到同一个计算上，计算结束后登记被移除。
pub struct SizeSession {
    cache: Arc<SizeCache>,
    settings: Settings,

    /// 配置规则与忽略文件合并后的规则
    ignore_patterns: RwLock<Vec<String>>,

    in_flight: Arc<DashMap<PathBuf, InFlight>>,
    next_ticket: AtomicU64,
}

impl SizeSession {
    /// 使用配置创建会话
    pub fn new(settings: Settings) -> Self {
        Self::with_cache(settings, Arc::new(SizeCache::new()))
    }

    /// 使用外部持有的缓存创建会话
    pub fn with_cache(settings: Settings, cache: Arc<SizeCache>) -> Self {
        Self {
            ignore_patterns: RwLock::new(settings.ignore_patterns.clone()),
            cache,
            settings,
            in_flight: Arc::new(DashMap::new()),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<SizeCache> {
        &self.cache
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// 当前生效的忽略规则
    pub fn ignore_patterns(&self) -> Vec<String> {
        match self.ignore_patterns.read() {
            Ok(patterns) => patterns.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 替换当前生效的忽略规则
    pub fn set_ignore_patterns(&self, patterns: Vec<String>) {
        let mut guard = match self.ignore_patterns.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = patterns;
    }

    /// 重新读取工作区忽略文件，并与配置中的规则合并
    pub async fn reload_ignore_file(&self, workspace_root: &Path) -> Vec<String> {
        let file_patterns = load_ignore_file(workspace_root, &self.settings.ignore_file).await;
        let merged = merge_patterns(&self.settings.ignore_patterns, &file_patterns);

        tracing::info!(
            "忽略规则已更新: 配置 {} 条, 忽略文件 {} 条, 合并后 {} 条",
            self.settings.ignore_patterns.len(),
            file_patterns.len(),
            merged.len()
        );

        self.set_ignore_patterns(merged.clone());
        merged
    }

    /// 构造共享会话缓存的分析选项
    pub fn options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            ignore: self.ignore_patterns(),
            concurrency_limit: self.settings.effective_concurrency(),
            decimals: self.settings.decimals,
            cache: Some(self.cache.clone()),
            cancel: None,
        }
    }

    /// 已缓存的路径大小
    pub fn cached_size(&self, path: &Path) -> Option<u64> {
        self.cache.get(path)
    }

    /// 正在进行的计算数量
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// 按需计算单个路径的大小
    pub async fn request(&self, path: &Path) -> FolderSizeResult {
        if let Some(size) = self.cache.get(path) {
            return FolderSizeResult::success(path, size, self.settings.decimals);
        }
        self.request_handle(path).await
    }

    /// 获取路径的计算句柄，已有计算时复用
    pub fn request_handle(&self, path: &Path) -> SizeRequest {
        match self.in_flight.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => entry.get().request.clone(),
            Entry::Vacant(entry) => {
                let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
                let request = self.start_request(path.to_path_buf(), ticket);
                entry.insert(InFlight {
                    ticket,
                    request: request.clone(),
                });
                request
            }
        }
    }

    fn start_request(&self, path: PathBuf, ticket: u64) -> SizeRequest {
        let options = self.options();
        let registry = self.in_flight.clone();

        async move {
            let mut results = analyze_folders(&[&path], &options).await;

            // 只移除自己的登记，期间可能已被重新分析替换
            registry.remove_if(&path, |_, in_flight| in_flight.ticket == ticket);

            results
                .pop()
                .unwrap_or_else(|| FolderSizeResult::failure(&path, RootError::Cancelled))
        }
        .boxed()
        .shared()
    }

    /// 批量分析多个根路径
    pub async fn analyze<P: AsRef<Path>>(
        &self,
        roots: &[P],
        cancel: Option<CancellationToken>,
    ) -> Vec<FolderSizeResult> {
        let options = AnalyzeOptions {
            cancel,
            ..self.options()
        };
        analyze_folders(roots, &options).await
    }

    /// 分析工作区的顶层目录
    ///
    /// 先清空缓存开启新的遍历代，再分析每个配置的目标目录。
    /// 不存在的目标目录以 "Folder not found" 返回；未配置目标目录时分析所有顶层目录。
    pub async fn analyze_workspace(
        &self,
        workspace_root: &Path,
        cancel: Option<CancellationToken>,
    ) -> anyhow::Result<AnalysisSummary> {
        self.reload_ignore_file(workspace_root).await;
        self.refresh();

        let folders: Vec<PathBuf> = if self.settings.target_folders.is_empty() {
            workspace_folders(workspace_root, &[]).await?
        } else {
            self.settings
                .target_folders
                .iter()
                .map(|folder| workspace_root.join(folder))
                .collect()
        };
        let results = self.analyze(&folders, cancel).await;

        Ok(AnalysisSummary::from_results(results, self.settings.decimals))
    }

    /// 目录下最大的子项
    pub async fn top_children(&self, dir_path: &Path, limit: usize) -> anyhow::Result<Vec<ChildSize>> {
        analyze_children(dir_path, &self.options(), limit, self.settings.show_hidden).await
    }

    /// 重新分析单个路径：移除该子树及祖先的缓存和正在进行的计算
    pub fn reanalyze(&self, path: &Path) -> usize {
        self.in_flight.remove(path);
        self.cache.invalidate_subtree(path)
    }

    /// 清空缓存，开启新的遍历代
    pub fn refresh(&self) -> u64 {
        self.in_flight.clear();
        self.cache.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn build_sample_tree(root: &Path) {
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("a").join("x"), vec![0u8; 100]).unwrap();
        fs::write(root.join("a").join("y"), vec![0u8; 924]).unwrap();
        fs::write(root.join("b"), vec![0u8; 1024]).unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_computation() {
        let temp_dir = tempdir().unwrap();
        build_sample_tree(temp_dir.path());
        let session = SizeSession::new(Settings::default());

        let first = session.request_handle(temp_dir.path());
        let second = session.request_handle(temp_dir.path());

        assert!(first.ptr_eq(&second));
        assert_eq!(session.in_flight_count(), 1);

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, b);
        assert_eq!(a.size, 2048);

        // 计算结束后登记被移除
        assert_eq!(session.in_flight_count(), 0);
        assert_eq!(session.cached_size(temp_dir.path()), Some(2048));
    }

    #[tokio::test]
    async fn test_request_uses_cache() {
        let temp_dir = tempdir().unwrap();
        build_sample_tree(temp_dir.path());
        let session = SizeSession::new(Settings::default());

        let first = session.request(temp_dir.path()).await;
        fs::write(temp_dir.path().join("c"), vec![0u8; 4096]).unwrap();
        let second = session.request(temp_dir.path()).await;

        // 第二次直接命中缓存
        assert_eq!(first.size, second.size);

        session.reanalyze(&temp_dir.path().join("c"));
        let third = session.request(temp_dir.path()).await;
        assert_eq!(third.size, 2048 + 4096);
    }

    #[tokio::test]
    async fn test_reanalyze_replaces_in_flight_request() {
        let temp_dir = tempdir().unwrap();
        build_sample_tree(temp_dir.path());
        let session = SizeSession::new(Settings::default());

        let stale = session.request_handle(temp_dir.path());
        session.reanalyze(temp_dir.path());
        let fresh = session.request_handle(temp_dir.path());

        assert!(!stale.ptr_eq(&fresh));

        // 旧计算结束时不能移除新的登记
        stale.await;
        assert_eq!(session.in_flight_count(), 1);
        fresh.await;
        assert_eq!(session.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_workspace_analysis_with_ignore_file() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        for name in ["node_modules", "dist", "src"] {
            fs::create_dir(root.join(name)).unwrap();
            fs::write(root.join(name).join("file"), vec![0u8; 1024]).unwrap();
        }

        let anchored = format!("{}/dist/**", crate::scanner::ignore::normalize_path(root));
        fs::write(root.join(".folder-size-ignore"), format!("# generated\n{}\n", anchored)).unwrap();

        let settings = Settings {
            target_folders: vec!["node_modules".to_string(), "dist".to_string(), "build".to_string()],
            ..Settings::default()
        };
        let session = SizeSession::new(settings);

        let summary = session.analyze_workspace(root, None).await.unwrap();

        assert_eq!(session.ignore_patterns(), vec![anchored]);

        // 每个目标目录一个结果，顺序与配置一致
        let paths: Vec<_> = summary.results.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec![root.join("node_modules"), root.join("dist"), root.join("build")]);
        assert_eq!(summary.results[0].size, 1024);
        assert_eq!(summary.results[1].size, 0);
        assert_eq!(summary.results[2].error, Some(RootError::NotFound));

        assert_eq!(summary.total_size, 1024);
        assert_eq!(summary.formatted_total, "1 KB");
        assert!(summary.reportable_errors().is_empty());
    }

    #[tokio::test]
    async fn test_workspace_without_targets_uses_top_level_folders() {
        let temp_dir = tempdir().unwrap();
        build_sample_tree(temp_dir.path());
        let settings = Settings {
            target_folders: Vec::new(),
            ..Settings::default()
        };
        let session = SizeSession::new(settings);

        let summary = session.analyze_workspace(temp_dir.path(), None).await.unwrap();

        assert_eq!(summary.results.len(), 1);
        assert_eq!(summary.results[0].path, temp_dir.path().join("a"));
        assert_eq!(summary.total_size, 1024);
    }

    #[tokio::test]
    async fn test_refresh_starts_new_generation() {
        let temp_dir = tempdir().unwrap();
        build_sample_tree(temp_dir.path());
        let session = SizeSession::new(Settings::default());

        session.request(temp_dir.path()).await;
        assert!(!session.cache().is_empty());

        let generation = session.refresh();
        assert_eq!(generation, session.cache().generation());
        assert!(session.cache().is_empty());
        assert_eq!(session.in_flight_count(), 0);
    }
}
