use serde::{Serialize, Serializer};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils::size_format::format_bytes_with;

/// 根路径级别的错误（唯一会出现在最终结果中的错误）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RootError {
    /// 根路径不存在
    #[error("Folder not found")]
    NotFound,

    /// 根路径存在但无法访问，保留底层错误信息
    #[error("{0}")]
    Access(String),

    /// 取消信号已触发，该根路径未开始分析
    #[error("Cancelled")]
    Cancelled,
}

impl From<io::Error> for RootError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => RootError::NotFound,
            _ => RootError::Access(err.to_string()),
        }
    }
}

impl Serialize for RootError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// 单个根路径的大小分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderSizeResult {
    /// 请求分析的路径
    pub path: PathBuf,

    /// 递归总字节数
    pub size: u64,

    /// 友好显示的大小
    pub formatted_size: String,

    /// 根路径错误（成功时为空）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RootError>,
}

impl FolderSizeResult {
    /// 创建成功的结果
    pub fn success(path: &Path, size: u64, decimals: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            size,
            formatted_size: format_bytes_with(size, decimals),
            error: None,
        }
    }

    /// 创建失败的结果，大小固定为 0
    pub fn failure(path: &Path, error: RootError) -> Self {
        Self {
            path: path.to_path_buf(),
            size: 0,
            formatted_size: format_bytes_with(0, 0),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.error, Some(RootError::NotFound))
    }
}

/// 子项大小（用于图表/排行展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildSize {
    /// 子项名称
    pub name: String,

    /// 子项完整路径
    pub path: PathBuf,

    /// 字节数
    pub size: u64,

    /// 友好显示的大小
    pub formatted_size: String,
}

/// 一次批量分析的汇总
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    /// 各根路径的结果，与输入顺序一致
    pub results: Vec<FolderSizeResult>,

    /// 成功结果的总大小
    pub total_size: u64,

    /// 友好显示的总大小
    pub formatted_total: String,
}

impl AnalysisSummary {
    /// 从结果列表汇总，失败的根路径不计入总数
    pub fn from_results(results: Vec<FolderSizeResult>, decimals: usize) -> Self {
        let total_size = results
            .iter()
            .filter(|r| r.is_ok())
            .map(|r| r.size)
            .sum();

        Self {
            results,
            total_size,
            formatted_total: format_bytes_with(total_size, decimals),
        }
    }

    /// 需要报告的错误（"Folder not found" 属于预期情况，不报告）
    pub fn reportable_errors(&self) -> Vec<&FolderSizeResult> {
        self.results
            .iter()
            .filter(|r| !r.is_ok() && !r.is_not_found())
            .collect()
    }
}
