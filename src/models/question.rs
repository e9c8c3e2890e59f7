use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PoolIndexWarning;
use crate::models::knowledge::normalize_code;

/// 题型
///
/// 字母代码沿用题库模板中的编码（如 `B（单选题）`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QuestionType {
    /// 单选题
    SingleChoice,
    /// 多选题
    MultipleChoice,
    /// 判断题
    TrueFalse,
    /// 填空题
    FillBlank,
    /// 简答题
    ShortAnswer,
    /// 计算题
    Calculation,
    /// 论述题
    Essay,
    /// 案例分析
    CaseAnalysis,
    /// 综合题
    Comprehensive,
}

static TYPE_ALIASES: phf::Map<&'static str, QuestionType> = phf::phf_map! {
    "B" => QuestionType::SingleChoice,
    "single_choice" => QuestionType::SingleChoice,
    "单选题" => QuestionType::SingleChoice,
    "单选" => QuestionType::SingleChoice,
    "G" => QuestionType::MultipleChoice,
    "multiple_choice" => QuestionType::MultipleChoice,
    "多选题" => QuestionType::MultipleChoice,
    "多选" => QuestionType::MultipleChoice,
    "C" => QuestionType::TrueFalse,
    "true_false" => QuestionType::TrueFalse,
    "判断题" => QuestionType::TrueFalse,
    "判断" => QuestionType::TrueFalse,
    "T" => QuestionType::FillBlank,
    "fill_blank" => QuestionType::FillBlank,
    "填空题" => QuestionType::FillBlank,
    "填空" => QuestionType::FillBlank,
    "D" => QuestionType::ShortAnswer,
    "short_answer" => QuestionType::ShortAnswer,
    "简答题" => QuestionType::ShortAnswer,
    "简答" => QuestionType::ShortAnswer,
    "U" => QuestionType::Calculation,
    "calculation" => QuestionType::Calculation,
    "计算题" => QuestionType::Calculation,
    "W" => QuestionType::Essay,
    "essay" => QuestionType::Essay,
    "论述题" => QuestionType::Essay,
    "E" => QuestionType::CaseAnalysis,
    "case_analysis" => QuestionType::CaseAnalysis,
    "案例分析" => QuestionType::CaseAnalysis,
    "案例分析题" => QuestionType::CaseAnalysis,
    "F" => QuestionType::Comprehensive,
    "comprehensive" => QuestionType::Comprehensive,
    "综合题" => QuestionType::Comprehensive,
    "组合题" => QuestionType::Comprehensive,
};

impl QuestionType {
    /// 全部题型，按声明顺序
    pub const ALL: [QuestionType; 9] = [
        QuestionType::SingleChoice,
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::FillBlank,
        QuestionType::ShortAnswer,
        QuestionType::Calculation,
        QuestionType::Essay,
        QuestionType::CaseAnalysis,
        QuestionType::Comprehensive,
    ];

    /// 获取题型字母代码
    pub fn code(self) -> char {
        match self {
            QuestionType::SingleChoice => 'B',
            QuestionType::MultipleChoice => 'G',
            QuestionType::TrueFalse => 'C',
            QuestionType::FillBlank => 'T',
            QuestionType::ShortAnswer => 'D',
            QuestionType::Calculation => 'U',
            QuestionType::Essay => 'W',
            QuestionType::CaseAnalysis => 'E',
            QuestionType::Comprehensive => 'F',
        }
    }

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "单选题",
            QuestionType::MultipleChoice => "多选题",
            QuestionType::TrueFalse => "判断题",
            QuestionType::FillBlank => "填空题",
            QuestionType::ShortAnswer => "简答题",
            QuestionType::Calculation => "计算题",
            QuestionType::Essay => "论述题",
            QuestionType::CaseAnalysis => "案例分析",
            QuestionType::Comprehensive => "综合题",
        }
    }

    /// 从字母代码解析题型
    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code.to_ascii_uppercase())
    }

    /// 智能查找题型
    ///
    /// 支持字母代码、英文名、中文名以及 `B（单选题）` / `B(单选题)` 形式。
    pub fn find(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(t) = TYPE_ALIASES.get(trimmed) {
            return Some(*t);
        }

        // 模板中的 "B（单选题）" 形式：取括号前的部分
        let head = trimmed
            .split(['（', '('])
            .next()
            .unwrap_or_default()
            .trim();
        if !head.is_empty() && head != trimmed {
            if let Some(t) = TYPE_ALIASES.get(head) {
                return Some(*t);
            }
        }

        let lower = trimmed.to_ascii_lowercase();
        if let Some(t) = TYPE_ALIASES.get(lower.as_str()) {
            return Some(*t);
        }
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_code(c),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for QuestionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buf = [0u8; 4];
        serializer.serialize_str(self.code().encode_utf8(&mut buf))
    }
}

impl<'de> Deserialize<'de> for QuestionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        QuestionType::find(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("无法识别的题型: {raw}")))
    }
}

/// 题库中的一道题
///
/// 引擎只读取题目，从不修改。`type_code` 与 `leaf_knowledge_code`
/// 保留题库中声明的原始值，缺失或无法识别时由索引/统计阶段给出警告。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(alias = "ID")]
    pub id: String,

    #[serde(
        default,
        alias = "type",
        alias = "题型代码",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_code: Option<String>,

    #[serde(
        default,
        alias = "knowledge_point_l3",
        alias = "leaf_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub leaf_knowledge_code: Option<String>,

    #[serde(default)]
    pub stem: String,

    #[serde(default)]
    pub answer: String,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl QuestionRecord {
    /// 创建只包含分类字段的题目
    pub fn new(
        id: impl Into<String>,
        question_type: QuestionType,
        leaf_code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            type_code: Some(question_type.code().to_string()),
            leaf_knowledge_code: Some(leaf_code.into()),
            stem: String::new(),
            answer: String::new(),
            metadata: serde_json::Value::Null,
        }
    }

    /// 解析声明的题型
    pub fn question_type(&self) -> Option<QuestionType> {
        self.type_code.as_deref().and_then(QuestionType::find)
    }

    /// 归一化后的三级知识点代码，空值视为缺失
    pub fn leaf_code(&self) -> Option<String> {
        self.leaf_knowledge_code
            .as_deref()
            .map(normalize_code)
            .filter(|c| !c.is_empty())
    }

    /// 按声明字段归类为 (知识点, 题型)
    pub fn classify(&self) -> Result<(String, QuestionType), PoolIndexWarning> {
        let question_type = match self.type_code.as_deref() {
            None => {
                return Err(PoolIndexWarning::MissingTypeCode {
                    id: self.id.clone(),
                })
            }
            Some(raw) => QuestionType::find(raw).ok_or_else(|| PoolIndexWarning::UnknownTypeCode {
                id: self.id.clone(),
                raw: raw.to_string(),
            })?,
        };
        let leaf_code = self.leaf_code().ok_or_else(|| PoolIndexWarning::MissingLeafCode {
            id: self.id.clone(),
        })?;
        Ok((leaf_code, question_type))
    }
}
