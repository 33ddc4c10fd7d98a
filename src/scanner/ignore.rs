use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, MAIN_SEPARATOR};

/// 忽略规则匹配器
///
/// 规则是针对绝对路径的 glob 表达式，路径在匹配前统一为 `/` 分隔。
/// `*` 不跨越目录分隔符，`**` 可以匹配任意层级，以 `.` 开头的名称同样会被匹配。
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    patterns: Vec<String>,
    set: GlobSet,
}

impl IgnoreMatcher {
    /// 编译忽略规则，无效的规则会被跳过并记录警告
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut accepted = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }

            match GlobBuilder::new(pattern).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                    accepted.push(pattern.to_string());
                }
                Err(e) => {
                    tracing::warn!("忽略无效的匹配规则 {}: {}", pattern, e);
                }
            }
        }

        let set = builder.build().unwrap_or_else(|e| {
            tracing::warn!("编译忽略规则失败: {}", e);
            accepted.clear();
            GlobSet::empty()
        });

        Self {
            patterns: accepted,
            set,
        }
    }

    /// 不忽略任何路径的匹配器
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// 检查路径是否应该被忽略
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.set.is_empty() {
            return false;
        }
        self.set.is_match(normalize_path(path))
    }

    /// 实际生效的规则
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        Self::empty()
    }
}

/// 将路径转换为 `/` 分隔的字符串
pub fn normalize_path(path: &Path) -> String {
    let text = path.to_string_lossy();
    if MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(MAIN_SEPARATOR, "/")
    }
}
