use crate::scanner::limiter::DEFAULT_CONCURRENCY_LIMIT;
use crate::utils::size_format::DEFAULT_DECIMALS;

pub struct DefaultConfig;

impl DefaultConfig {
    /// 默认分析的工作区目录名
    pub fn default_target_folders() -> Vec<String> {
        ["node_modules", "dist", "build", "cache"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// 默认的忽略文件名（位于工作区根目录）
    pub fn default_ignore_file() -> String {
        ".folder-size-ignore".to_string()
    }

    /// 默认并发限制
    pub fn default_concurrency_limit() -> usize {
        DEFAULT_CONCURRENCY_LIMIT
    }

    /// 默认小数位数
    pub fn default_decimals() -> usize {
        DEFAULT_DECIMALS
    }
}
