use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::knowledge::normalize_code;
use crate::models::question::QuestionType;

/// 蓝图文档
///
/// 对应题库规则模板：1~3 级知识点树，叶子节点上配置各题型题量。
/// 题量按"每个并行知识点"计，实际要求 = 题量 × `parallel_points`。
///
/// 并行知识点数的读取顺序：`config.parallel_knowledge_points`，
/// 顶层 `parallel_points`，最后是默认值。带 `config` 段的规则模板缺省为 5，
/// 其余缺省为 1。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBlueprint")]
pub struct Blueprint {
    pub name: String,
    pub parallel_points: u32,
    pub nodes: Vec<BlueprintNode>,
}

fn default_parallel_points() -> u32 {
    1
}

/// 规则模板 `config` 段缺省的并行知识点数
pub const TEMPLATE_PARALLEL_POINTS: u32 = 5;

/// 规则模板的 `config` 段
#[derive(Debug, Deserialize)]
struct TemplateConfig {
    #[serde(default)]
    parallel_knowledge_points: Option<u32>,
}

#[derive(Deserialize)]
struct RawBlueprint {
    #[serde(default)]
    name: String,

    #[serde(default, alias = "parallel_knowledge_points")]
    parallel_points: Option<u32>,

    #[serde(default)]
    config: Option<TemplateConfig>,

    #[serde(default, alias = "blueprint", alias = "children")]
    nodes: Vec<BlueprintNode>,
}

impl From<RawBlueprint> for Blueprint {
    fn from(raw: RawBlueprint) -> Self {
        let parallel_points = match raw.config {
            Some(config) => config
                .parallel_knowledge_points
                .or(raw.parallel_points)
                .unwrap_or(TEMPLATE_PARALLEL_POINTS),
            None => raw.parallel_points.unwrap_or_else(default_parallel_points),
        };
        Self {
            name: raw.name,
            parallel_points,
            nodes: raw.nodes,
        }
    }
}

impl Blueprint {
    /// 以单个根节点构造蓝图
    pub fn from_root(root: BlueprintNode) -> Self {
        Self {
            name: String::new(),
            parallel_points: default_parallel_points(),
            nodes: vec![root],
        }
    }

    /// 以多个顶层节点构造蓝图
    pub fn new(name: impl Into<String>, nodes: Vec<BlueprintNode>) -> Self {
        Self {
            name: name.into(),
            parallel_points: default_parallel_points(),
            nodes,
        }
    }

    pub fn with_parallel_points(mut self, parallel_points: u32) -> Self {
        self.parallel_points = parallel_points;
        self
    }
}

/// 蓝图节点
///
/// 非叶子节点只有 `children`，叶子节点只有 `quotas`。
/// 题量保存为原始数字，负数和小数在展开时报告为格式错误。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintNode {
    pub code: String,

    /// 相对权重，仅作展示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlueprintNode>,

    #[serde(default, alias = "questions", skip_serializing_if = "BTreeMap::is_empty")]
    pub quotas: BTreeMap<String, serde_json::Number>,
}

impl BlueprintNode {
    /// 创建非叶子节点
    pub fn branch(code: impl Into<String>, children: Vec<BlueprintNode>) -> Self {
        Self {
            code: code.into(),
            weight: None,
            children,
            quotas: BTreeMap::new(),
        }
    }

    /// 创建叶子节点
    pub fn leaf<I, K>(code: impl Into<String>, quotas: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        Self {
            code: code.into(),
            weight: None,
            children: Vec::new(),
            quotas: quotas
                .into_iter()
                .map(|(k, v)| (k.into(), serde_json::Number::from(v)))
                .collect(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// 抽题要求：一个 (知识点, 题型) 单元格需要的题量
///
/// 每次组题时由蓝图展开一次，只包含题量大于 0 的单元格。
/// `leaf_code` 在构造和反序列化时归一化，与索引键一致。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SamplingRequirement {
    #[serde(deserialize_with = "normalized_code")]
    pub leaf_code: String,
    pub type_code: QuestionType,
    pub required_count: usize,
}

impl SamplingRequirement {
    pub fn new(leaf_code: impl Into<String>, type_code: QuestionType, required_count: usize) -> Self {
        Self {
            leaf_code: normalize_code(&leaf_code.into()),
            type_code,
            required_count,
        }
    }
}

fn normalized_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_code(&raw))
}

impl std::fmt::Display for SamplingRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} × {} ({})",
            self.leaf_code,
            self.type_code,
            self.required_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_blueprint_json() {
        let json = r#"{
            "config": {"parallel_knowledge_points": 2, "difficulty": "mixed"},
            "blueprint": [
                {"code": "A", "children": [
                    {"code": "B", "children": [
                        {"code": "C", "questions": {"B": 2, "C": 0}}
                    ]}
                ]}
            ]
        }"#;
        let blueprint: Blueprint = serde_json::from_str(json).unwrap();
        assert_eq!(blueprint.parallel_points, 2);
        assert_eq!(blueprint.nodes.len(), 1);
        let leaf = &blueprint.nodes[0].children[0].children[0];
        assert!(leaf.is_leaf());
        assert_eq!(leaf.quotas.len(), 2);
    }

    #[test]
    fn parses_toml_blueprint() {
        let text = r#"
name = "样例蓝图"

[[nodes]]
code = "A"
weight = 0.5

[[nodes.children]]
code = "B"

[[nodes.children.children]]
code = "C"
quotas = { single_choice = 3, true_false = 1 }
"#;
        let blueprint: Blueprint = toml::from_str(text).unwrap();
        assert_eq!(blueprint.name, "样例蓝图");
        assert_eq!(blueprint.parallel_points, 1);
        let leaf = &blueprint.nodes[0].children[0].children[0];
        assert_eq!(leaf.quotas["single_choice"].as_u64(), Some(3));
        assert_eq!(blueprint.nodes[0].weight, Some(0.5));
    }

    #[test]
    fn template_config_without_points_uses_template_default() {
        let json = r#"{"config": {}, "blueprint": [{"code": "A", "questions": {"B": 1}}]}"#;
        let blueprint: Blueprint = serde_json::from_str(json).unwrap();
        assert_eq!(blueprint.parallel_points, TEMPLATE_PARALLEL_POINTS);
    }

    #[test]
    fn nested_config_points_win_over_top_level() {
        let json = r#"{
            "parallel_points": 2,
            "config": {"parallel_knowledge_points": 4},
            "nodes": [{"code": "A", "questions": {"B": 1}}]
        }"#;
        let blueprint: Blueprint = serde_json::from_str(json).unwrap();
        assert_eq!(blueprint.parallel_points, 4);

        let plain: Blueprint =
            serde_json::from_str(r#"{"parallel_knowledge_points": 3, "nodes": []}"#).unwrap();
        assert_eq!(plain.parallel_points, 3);
    }

    #[test]
    fn requirement_leaf_code_is_normalized() {
        let built = SamplingRequirement::new(" A_B－C ", QuestionType::SingleChoice, 1);
        assert_eq!(built.leaf_code, "A-B-C");

        let parsed: SamplingRequirement = serde_json::from_str(
            r#"{"leaf_code": "A—B_C", "type_code": "B", "required_count": 2}"#,
        )
        .unwrap();
        assert_eq!(parsed.leaf_code, "A-B-C");
    }
}
