use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 由本工具写入的忽略文件头部
pub const IGNORE_FILE_HEADER: [&str; 3] = [
    "# Folder Size Ignore File",
    "# Lines below are glob patterns matched against absolute paths",
    "# Top-level selections managed by: folder-size ignore-suggest --write",
];

/// 解析忽略文件内容：每行一条规则，跳过空行和 `#` 注释
pub fn parse_ignore_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// 读取工作区根目录下的忽略文件，文件不存在或无法读取时返回空列表
pub async fn load_ignore_file(workspace_root: &Path, file_name: &str) -> Vec<String> {
    let path = workspace_root.join(file_name);

    match fs::read_to_string(&path).await {
        Ok(content) => parse_ignore_file(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            tracing::warn!("读取忽略文件失败 {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// 合并配置中的规则和忽略文件中的规则，去重并保留首次出现的顺序
pub fn merge_patterns(settings: &[String], file: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();

    settings
        .iter()
        .chain(file.iter())
        .filter(|pattern| seen.insert(pattern.as_str()))
        .cloned()
        .collect()
}

/// 生成新的忽略文件内容
///
/// 保留现有内容中不属于 `managed` 的行（空行和旧头部除外），
/// 顶层目录规则替换为 `selected`。
pub fn compose_ignore_file(existing: &str, managed: &[String], selected: &[String]) -> String {
    let retained = existing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !IGNORE_FILE_HEADER.contains(line))
        .filter(|line| !managed.iter().any(|pattern| pattern == line));

    let mut lines: Vec<&str> = IGNORE_FILE_HEADER.to_vec();
    lines.push("");
    lines.extend(retained);
    lines.extend(selected.iter().map(String::as_str));

    lines.join("\n")
}

/// 更新工作区根目录下的忽略文件，返回文件路径
pub async fn write_ignore_file(
    workspace_root: &Path,
    file_name: &str,
    managed: &[String],
    selected: &[String],
) -> Result<PathBuf> {
    let path = workspace_root.join(file_name);

    let existing = match fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    fs::write(&path, compose_ignore_file(&existing, managed, selected)).await?;
    tracing::info!("忽略文件已更新: {} ({} 条顶层规则)", path.display(), selected.len());

    Ok(path)
}
