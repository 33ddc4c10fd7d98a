mod cli;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands, ConfigAction, OutputFormat};
use folder_size::config::{write_ignore_file, Settings};
use folder_size::scanner::{anchored_ignore_patterns, SizeSession};
use folder_size::{AnalysisSummary, ChildSize, FolderSizeResult};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志，默认 INFO，--verbose 时为 DEBUG
    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // 加载配置
    let settings = if let Some(config_path) = &cli.config {
        Settings::load_from_file(config_path)?
    } else {
        Settings::load_or_create_default()?
    };

    match cli.command {
        Commands::Analyze { paths, ignore, concurrency, decimals, format } => {
            let mut settings = settings;
            settings.ignore_patterns.extend(ignore);
            if let Some(limit) = concurrency {
                settings.concurrency_limit = limit;
            }
            if let Some(decimals) = decimals {
                settings.decimals = decimals;
            }

            let roots = absolute_paths(&paths)?;
            let session = SizeSession::new(settings);

            let progress = create_progress_bar(format!("分析 {} 个路径...", roots.len()));
            let results = session.analyze(&roots, Some(cancel_on_ctrl_c())).await;
            progress.finish_and_clear();

            let summary = AnalysisSummary::from_results(results, session.settings().decimals);
            print_summary(&summary, None, format)?;
        }
        Commands::Workspace { root, format } => {
            let root = absolute_path(&root)?;
            let session = SizeSession::new(settings);

            let progress = create_progress_bar(format!("分析工作区 {}...", root.display()));
            let summary = session.analyze_workspace(&root, Some(cancel_on_ctrl_c())).await?;
            progress.finish_and_clear();

            print_summary(&summary, Some(&root), format)?;
        }
        Commands::Top { path, limit, format } => {
            let path = absolute_path(&path)?;
            let session = SizeSession::new(settings);

            let progress = create_progress_bar(format!("准备 {} 的子项数据...", path.display()));
            let children = session.top_children(&path, limit).await?;
            progress.finish_and_clear();

            print_children(&children, format)?;
        }
        Commands::IgnoreSuggest { root, write, select } => {
            let root = absolute_path(&root)?;
            let patterns = anchored_ignore_patterns(&root).await?;

            let selected: Vec<String> = patterns
                .iter()
                .filter(|pattern| {
                    select.is_empty()
                        || select.iter().any(|name| pattern.ends_with(&format!("/{}/**", name)))
                })
                .cloned()
                .collect();

            if write {
                let path = write_ignore_file(&root, &settings.ignore_file, &patterns, &selected).await?;
                println!("忽略文件已更新: {}", path.display());
            } else {
                for pattern in &selected {
                    println!("{}", pattern);
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&settings)?);
            }
            ConfigAction::Reset => {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => Settings::default_config_path()?,
                };
                Settings::default().save_to_file(&path)?;
                println!("配置已重置: {}", path.display());
            }
            ConfigAction::Path => {
                println!("{}", Settings::default_config_path()?.display());
            }
        },
    }

    Ok(())
}

/// Ctrl-C 时停止开始新的根路径分析
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("收到中断信号，不再开始新的分析");
            child.cancel();
        }
    });
    token
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn absolute_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    paths.iter().map(|p| absolute_path(p)).collect()
}

fn create_progress_bar(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn print_summary(summary: &AnalysisSummary, root: Option<&Path>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    for result in summary.results.iter().filter(|r| r.is_ok()) {
        let display = root
            .and_then(|r| result.path.strip_prefix(r).ok())
            .unwrap_or(result.path.as_path());
        println!("📁 {:<30} → {}", display.display().to_string(), result.formatted_size);
    }

    // 工作区中不存在的目标目录属于预期情况，不输出
    let errors: Vec<&FolderSizeResult> = match root {
        Some(_) => summary.reportable_errors(),
        None => summary.results.iter().filter(|r| !r.is_ok()).collect(),
    };
    for result in errors {
        if let Some(error) = &result.error {
            println!("❌ {}: {}", result.path.display(), error);
        }
    }

    println!();
    println!("Total: {}", summary.formatted_total);
    Ok(())
}

fn print_children(children: &[ChildSize], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(children)?);
        return Ok(());
    }

    for child in children {
        println!("{:<30} {:>12}", child.name, child.formatted_size);
    }
    Ok(())
}
