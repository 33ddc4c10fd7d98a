use clap::{Parser, Subcommand};
use std::path::PathBuf;

use folder_size::scanner::analyzer::DEFAULT_TOP_CHILDREN;

#[derive(Parser)]
#[command(name = "folder-size")]
#[command(about = "递归统计目录大小的 CLI 工具")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 分析指定路径的大小
    Analyze {
        /// 要分析的路径
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// 额外的忽略规则（绝对路径 glob，可重复）
        #[arg(short, long)]
        ignore: Vec<String>,

        /// 同时进行的文件系统操作上限
        #[arg(long)]
        concurrency: Option<usize>,

        /// 大小显示的小数位数
        #[arg(long)]
        decimals: Option<usize>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// 分析工作区的顶层目录（按配置的目标目录筛选）
    Workspace {
        /// 工作区根目录
        #[arg(default_value = ".")]
        root: PathBuf,

        /// 输出格式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// 显示目录下最大的子项
    Top {
        /// 目录路径
        #[arg(default_value = ".")]
        path: PathBuf,

        /// 显示数量
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_CHILDREN)]
        limit: usize,

        /// 输出格式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// 为工作区顶层目录生成忽略规则
    IgnoreSuggest {
        /// 工作区根目录
        #[arg(default_value = ".")]
        root: PathBuf,

        /// 写入工作区的忽略文件（保留其中的自定义规则）
        #[arg(short, long)]
        write: bool,

        /// 只忽略这些顶层目录（可重复，默认全部）
        #[arg(short, long)]
        select: Vec<String>,
    },

    /// 管理配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// 显示当前配置
    Show,

    /// 重置为默认配置
    Reset,

    /// 显示配置文件路径
    Path,
}

#[derive(clap::ValueEnum, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    /// 表格格式
    Table,
    /// JSON 格式
    Json,
}
