//! 题目 ID 格式校验
//!
//! 标准格式：`{题型}-{1级}-{2级}-{3级}-{并行点序号}-{题目序号}`，例如 `B-A-B-C-001-002`。
//! 只校验格式，不从 ID 中反推题型或知识点。

use regex::Regex;
use serde::Serialize;

use crate::error::ConfigError;

/// 默认 ID 格式（不含首尾锚点）
pub const DEFAULT_ID_PATTERN: &str = r"[BGCTDUWEF]-[A-Z0-9]+-[A-Z0-9]+-[A-Z0-9]+-\d{3}-\d{3}";

/// ID 格式问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IdIssue {
    /// ID 为空
    Empty,
    /// 标准 ID 后附加了额外后缀（如重复导入时追加的 `#uuid`）
    Suffixed { canonical: String, suffix: String },
    /// 不符合标准格式
    PatternMismatch,
}

impl std::fmt::Display for IdIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdIssue::Empty => write!(f, "ID为空"),
            IdIssue::Suffixed { canonical, suffix } => {
                write!(f, "标准ID {} 后附加了后缀 '{}'", canonical, suffix)
            }
            IdIssue::PatternMismatch => write!(f, "不符合标准ID格式"),
        }
    }
}

/// ID 格式校验器
#[derive(Debug, Clone)]
pub struct IdGrammar {
    exact: Regex,
    prefix: Regex,
}

impl IdGrammar {
    /// 使用自定义格式创建（`pattern` 不应包含 `^`/`$`）
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let build = |p: String| {
            Regex::new(&p).map_err(|source| ConfigError::InvalidIdPattern {
                pattern: pattern.to_string(),
                source,
            })
        };
        Ok(Self {
            exact: build(format!("^(?:{pattern})$"))?,
            prefix: build(format!("^(?:{pattern})"))?,
        })
    }

    /// 检查 ID，符合格式时返回 `None`
    pub fn check(&self, id: &str) -> Option<IdIssue> {
        if id.trim().is_empty() {
            return Some(IdIssue::Empty);
        }
        if self.exact.is_match(id) {
            return None;
        }
        match self.prefix.find(id) {
            Some(m) if m.end() < id.len() => Some(IdIssue::Suffixed {
                canonical: m.as_str().to_string(),
                suffix: id[m.end()..].to_string(),
            }),
            _ => Some(IdIssue::PatternMismatch),
        }
    }

    pub fn is_canonical(&self, id: &str) -> bool {
        self.check(id).is_none()
    }
}

impl Default for IdGrammar {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PATTERN).expect("默认ID格式必须是合法正则")
    }
}
