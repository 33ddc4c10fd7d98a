pub mod config;
pub mod models;
pub mod scanner;
pub mod utils;

// 重新导出常用模块
pub use models::{AnalysisSummary, ChildSize, FolderSizeResult, RootError};
pub use scanner::{analyze_folders, AnalyzeOptions, ConcurrencyLimiter, SizeCache, SizeSession};
pub use utils::{format_bytes, format_bytes_with};
