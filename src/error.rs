use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::QuestionType;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 蓝图结构错误（组题前即中止）
    #[error("蓝图格式错误: {0}")]
    Blueprint(#[from] BlueprintFormatError),
    /// 题量不足（聚合全部缺口后一次性报告）
    #[error("组题失败: {0}")]
    Generation(#[from] PaperGenerationError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 蓝图格式错误
///
/// 结构性错误，在抽题之前立即抛出，由调用方决定是否修正蓝图后重试。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlueprintFormatError {
    /// 蓝图没有任何节点
    #[error("蓝图为空")]
    EmptyTree,
    /// 节点代码为空
    #[error("节点代码为空 (位置: {path})")]
    EmptyCode { path: String },
    /// 节点同时包含子节点和题量配置
    #[error("节点 {code} 同时包含子节点和题量配置")]
    ChildrenAndQuotas { code: String },
    /// 题量为负数
    #[error("知识点 {leaf_code} 的题型 {type_key} 题量为负数: {value}")]
    NegativeQuota {
        leaf_code: String,
        type_key: String,
        value: String,
    },
    /// 题量不是整数
    #[error("知识点 {leaf_code} 的题型 {type_key} 题量不是整数: {value}")]
    NonIntegerQuota {
        leaf_code: String,
        type_key: String,
        value: String,
    },
    /// 无法识别的题型
    #[error("知识点 {leaf_code} 包含无法识别的题型: {type_key}")]
    UnknownQuestionType { leaf_code: String, type_key: String },
    /// 同一叶子节点中同一题型出现多次（如同时写了 `B` 和 `single_choice`）
    #[error("知识点 {leaf_code} 的题型 {type_code} 重复配置")]
    DuplicateQuestionType {
        leaf_code: String,
        type_code: QuestionType,
    },
    /// 超出允许的层级
    #[error("节点 {code} 位于第 {depth} 级，超出最大层级 {max_depth}")]
    TooDeep {
        code: String,
        depth: usize,
        max_depth: usize,
    },
    /// 两个叶子节点解析为同一个知识点代码
    #[error("知识点代码重复: {leaf_code}")]
    DuplicateLeaf { leaf_code: String },
    /// 并行知识点数量为 0
    #[error("并行知识点数量必须大于 0")]
    ZeroParallelPoints,
    /// 题量乘以并行知识点数后溢出
    #[error("知识点 {leaf_code} 的题型 {type_code} 题量溢出")]
    QuotaOverflow {
        leaf_code: String,
        type_code: QuestionType,
    },
}

/// 题目缺少分类字段（跳过该题并给出警告，不中止）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolIndexWarning {
    #[error("题目 {id} 缺少题型")]
    MissingTypeCode { id: String },
    #[error("题目 {id} 的题型无法识别: {raw}")]
    UnknownTypeCode { id: String, raw: String },
    #[error("题目 {id} 缺少三级知识点代码")]
    MissingLeafCode { id: String },
}

/// 单个缺口：某知识点某题型的可用题目少于要求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortage {
    pub leaf_code: String,
    pub type_code: QuestionType,
    pub required: usize,
    pub available: usize,
}

impl fmt::Display for Shortage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "知识点 {} 题型 {}: 需要 {} 道, 可用 {} 道",
            self.leaf_code, self.type_code, self.required, self.available
        )
    }
}

/// 组题失败：一次遍历中发现的全部缺口
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} 项抽题要求题量不足: {}", .shortages.len(), format_shortages(.shortages))]
pub struct PaperGenerationError {
    pub shortages: Vec<Shortage>,
}

fn format_shortages(shortages: &[Shortage]) -> String {
    shortages
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 不支持的文件格式
    #[error("不支持的文件格式: {path}")]
    UnsupportedFormat { path: String },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 题目 ID 正则无效
    #[error("题目ID格式正则无效 ({pattern}): {source}")]
    InvalidIdPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

// ========== 辅助方法 ==========

impl AppError {
    /// 是否为题量不足错误
    pub fn shortages(&self) -> Option<&[Shortage]> {
        match self {
            AppError::Generation(e) => Some(&e.shortages),
            _ => None,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_lists_every_shortage() {
        let err = PaperGenerationError {
            shortages: vec![
                Shortage {
                    leaf_code: "C-A-A".to_string(),
                    type_code: QuestionType::SingleChoice,
                    required: 5,
                    available: 3,
                },
                Shortage {
                    leaf_code: "C-A-B".to_string(),
                    type_code: QuestionType::TrueFalse,
                    required: 2,
                    available: 0,
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 项"));
        assert!(msg.contains("C-A-A 题型 B: 需要 5 道, 可用 3 道"));
        assert!(msg.contains("C-A-B 题型 C"));

        let app: AppError = err.into();
        assert_eq!(app.shortages().map(|s| s.len()), Some(2));
    }
}
