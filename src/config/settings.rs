use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::Result;

use crate::config::defaults::DefaultConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 忽略规则（绝对路径 glob，匹配以 . 开头的名称）
    pub ignore_patterns: Vec<String>,

    /// 同时进行的文件系统操作上限
    pub concurrency_limit: usize,

    /// 工作区分析时关注的目录名，为空时分析所有顶层目录
    pub target_folders: Vec<String>,

    /// 工作区根目录下的忽略文件名
    pub ignore_file: String,

    /// 大小显示的小数位数
    pub decimals: usize,

    /// 是否在子项排行中显示隐藏条目
    pub show_hidden: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            concurrency_limit: DefaultConfig::default_concurrency_limit(),
            target_folders: DefaultConfig::default_target_folders(),
            ignore_file: DefaultConfig::default_ignore_file(),
            decimals: DefaultConfig::default_decimals(),
            show_hidden: false,
        }
    }
}

impl Settings {
    /// 从文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        Ok(settings)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        // 确保目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// 获取默认配置文件路径
    pub fn default_config_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("无法找到配置目录"))?;
        path.push("folder-size");
        path.push("config.toml");
        Ok(path)
    }

    /// 加载配置，如果文件不存在则创建默认配置
    pub fn load_or_create_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let settings = Self::default();
            settings.save_to_file(&config_path)?;
            Ok(settings)
        }
    }

    /// 实际使用的并发限制，最小为 1
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency_limit.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.concurrency_limit, 8);
        assert_eq!(settings.decimals, 2);
        assert_eq!(settings.ignore_file, ".folder-size-ignore");
        assert!(settings.target_folders.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let settings = Settings {
            ignore_patterns: vec!["**/.git/**".to_string()],
            concurrency_limit: 3,
            ..Settings::default()
        };
        settings.save_to_file(&path).unwrap();

        let loaded = Settings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "concurrency_limit = 0\n").unwrap();

        let loaded = Settings::load_from_file(&path).unwrap();
        assert_eq!(loaded.concurrency_limit, 0);
        assert_eq!(loaded.effective_concurrency(), 1);
        assert_eq!(loaded.decimals, 2);
    }
}
