//! 蓝图展开服务 - 业务能力层
//!
//! 深度优先遍历知识点树，把叶子节点上的题量展开为扁平的抽题要求列表。
//! 抽题和复核都只使用展开后的列表。

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::error::BlueprintFormatError;
use crate::models::{join_code, Blueprint, BlueprintNode, QuestionType, SamplingRequirement};

/// 知识点树的最大层级（1级 / 2级 / 3级）
pub const MAX_LEVELS: usize = 3;

/// 蓝图展开器
pub struct BlueprintFlattener {
    max_depth: usize,
}

impl BlueprintFlattener {
    pub fn new() -> Self {
        Self {
            max_depth: MAX_LEVELS,
        }
    }

    /// 自定义最大层级
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// 展开整份蓝图
    ///
    /// 输出顺序即树的遍历顺序；同一叶子内按题型声明顺序输出。
    /// 题量为 0 的单元格被跳过。
    pub fn flatten(
        &self,
        blueprint: &Blueprint,
    ) -> Result<Vec<SamplingRequirement>, BlueprintFormatError> {
        if blueprint.nodes.is_empty() {
            return Err(BlueprintFormatError::EmptyTree);
        }
        if blueprint.parallel_points == 0 {
            return Err(BlueprintFormatError::ZeroParallelPoints);
        }

        let mut walk = Walk {
            max_depth: self.max_depth,
            multiplier: blueprint.parallel_points as usize,
            seen_leaves: HashSet::new(),
            out: Vec::new(),
        };
        for node in &blueprint.nodes {
            walk.visit(node, None, 1)?;
        }

        debug!(
            "蓝图 {} 展开为 {} 条抽题要求",
            blueprint.name,
            walk.out.len()
        );
        Ok(walk.out)
    }
}

impl Default for BlueprintFlattener {
    fn default() -> Self {
        Self::new()
    }
}

struct Walk {
    max_depth: usize,
    multiplier: usize,
    seen_leaves: HashSet<String>,
    out: Vec<SamplingRequirement>,
}

impl Walk {
    fn visit(
        &mut self,
        node: &BlueprintNode,
        parent: Option<&str>,
        depth: usize,
    ) -> Result<(), BlueprintFormatError> {
        if node.code.trim().is_empty() {
            return Err(BlueprintFormatError::EmptyCode {
                path: parent.unwrap_or("<root>").to_string(),
            });
        }
        let code = join_code(parent, &node.code);

        if depth > self.max_depth {
            return Err(BlueprintFormatError::TooDeep {
                code,
                depth,
                max_depth: self.max_depth,
            });
        }
        if !node.children.is_empty() && !node.quotas.is_empty() {
            return Err(BlueprintFormatError::ChildrenAndQuotas { code });
        }

        if !node.children.is_empty() {
            for child in &node.children {
                self.visit(child, Some(&code), depth + 1)?;
            }
            return Ok(());
        }

        if !self.seen_leaves.insert(code.clone()) {
            return Err(BlueprintFormatError::DuplicateLeaf { leaf_code: code });
        }

        let quotas = parse_quotas(&code, node)?;
        if quotas.is_empty() {
            debug!("知识点 {} 没有题量配置", code);
        }
        for (question_type, per_point) in quotas {
            if per_point == 0 {
                continue;
            }
            let required_count = per_point.checked_mul(self.multiplier).ok_or_else(|| {
                BlueprintFormatError::QuotaOverflow {
                    leaf_code: code.clone(),
                    type_code: question_type,
                }
            })?;
            self.out.push(SamplingRequirement::new(
                code.clone(),
                question_type,
                required_count,
            ));
        }
        Ok(())
    }
}

/// 解析叶子节点的题量，按题型声明顺序返回
fn parse_quotas(
    leaf_code: &str,
    node: &BlueprintNode,
) -> Result<BTreeMap<QuestionType, usize>, BlueprintFormatError> {
    let mut quotas = BTreeMap::new();

    for (type_key, value) in &node.quotas {
        let question_type =
            QuestionType::find(type_key).ok_or_else(|| BlueprintFormatError::UnknownQuestionType {
                leaf_code: leaf_code.to_string(),
                type_key: type_key.clone(),
            })?;
        let count = quota_value(leaf_code, type_key, value)?;

        if quotas.insert(question_type, count).is_some() {
            return Err(BlueprintFormatError::DuplicateQuestionType {
                leaf_code: leaf_code.to_string(),
                type_code: question_type,
            });
        }
    }

    Ok(quotas)
}

fn quota_value(
    leaf_code: &str,
    type_key: &str,
    value: &serde_json::Number,
) -> Result<usize, BlueprintFormatError> {
    let negative = || BlueprintFormatError::NegativeQuota {
        leaf_code: leaf_code.to_string(),
        type_key: type_key.to_string(),
        value: value.to_string(),
    };
    let non_integer = || BlueprintFormatError::NonIntegerQuota {
        leaf_code: leaf_code.to_string(),
        type_key: type_key.to_string(),
        value: value.to_string(),
    };

    if let Some(v) = value.as_u64() {
        return usize::try_from(v).map_err(|_| non_integer());
    }
    if let Some(v) = value.as_i64() {
        // as_u64 失败的整数只可能是负数
        debug_assert!(v < 0);
        return Err(negative());
    }

    let v = value.as_f64().ok_or_else(non_integer)?;
    if v < 0.0 {
        Err(negative())
    } else if v.fract() != 0.0 || !v.is_finite() || v > usize::MAX as f64 {
        Err(non_integer())
    } else {
        Ok(v as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_level(leaves: Vec<BlueprintNode>) -> Blueprint {
        Blueprint::new(
            "test",
            vec![BlueprintNode::branch(
                "C",
                vec![BlueprintNode::branch("A", leaves)],
            )],
        )
    }

    fn number(v: f64) -> serde_json::Number {
        serde_json::Number::from_f64(v).unwrap()
    }

    #[test]
    fn flattens_in_traversal_order() {
        let blueprint = three_level(vec![
            BlueprintNode::leaf("A", [("true_false", 2), ("single_choice", 5)]),
            BlueprintNode::leaf("B", [("B", 0), ("G", 1)]),
        ]);
        let reqs = BlueprintFlattener::new().flatten(&blueprint).unwrap();

        assert_eq!(
            reqs,
            vec![
                SamplingRequirement::new("C-A-A", QuestionType::SingleChoice, 5),
                SamplingRequirement::new("C-A-A", QuestionType::TrueFalse, 2),
                SamplingRequirement::new("C-A-B", QuestionType::MultipleChoice, 1),
            ]
        );
    }

    #[test]
    fn multiplies_by_parallel_points() {
        let blueprint = three_level(vec![BlueprintNode::leaf("A", [("B", 2)])])
            .with_parallel_points(5);
        let reqs = BlueprintFlattener::new().flatten(&blueprint).unwrap();
        assert_eq!(reqs[0].required_count, 10);
    }

    #[test]
    fn template_config_points_scale_quotas() {
        let json = r#"{
            "config": {"parallel_knowledge_points": 5},
            "blueprint": [
                {"code": "A", "children": [
                    {"code": "B", "children": [
                        {"code": "C", "questions": {"B": 2}}
                    ]}
                ]}
            ]
        }"#;
        let blueprint: Blueprint = serde_json::from_str(json).unwrap();
        let reqs = BlueprintFlattener::new().flatten(&blueprint).unwrap();
        assert_eq!(
            reqs,
            vec![SamplingRequirement::new("A-B-C", QuestionType::SingleChoice, 10)]
        );
    }

    #[test]
    fn accepts_full_path_child_codes() {
        let blueprint = Blueprint::from_root(BlueprintNode::branch(
            "C",
            vec![BlueprintNode::branch(
                "C-A",
                vec![BlueprintNode::leaf("C-A-A", [("B", 1)])],
            )],
        ));
        let reqs = BlueprintFlattener::new().flatten(&blueprint).unwrap();
        assert_eq!(reqs[0].leaf_code, "C-A-A");
    }

    #[test]
    fn rejects_empty_tree() {
        let blueprint = Blueprint::new("empty", vec![]);
        assert_eq!(
            BlueprintFlattener::new().flatten(&blueprint),
            Err(BlueprintFormatError::EmptyTree)
        );
    }

    #[test]
    fn rejects_node_with_children_and_quotas() {
        let mut branch = BlueprintNode::branch("C", vec![BlueprintNode::leaf("A", [("B", 1)])]);
        branch
            .quotas
            .insert("B".to_string(), serde_json::Number::from(1));
        let err = BlueprintFlattener::new()
            .flatten(&Blueprint::from_root(branch))
            .unwrap_err();
        assert_eq!(
            err,
            BlueprintFormatError::ChildrenAndQuotas {
                code: "C".to_string()
            }
        );
    }

    #[test]
    fn rejects_negative_and_fractional_quotas() {
        let mut leaf = BlueprintNode::leaf("A", Vec::<(String, u64)>::new());
        leaf.quotas
            .insert("B".to_string(), serde_json::Number::from(-1));
        let err = BlueprintFlattener::new()
            .flatten(&three_level(vec![leaf]))
            .unwrap_err();
        assert!(matches!(err, BlueprintFormatError::NegativeQuota { .. }));

        let mut leaf = BlueprintNode::leaf("A", Vec::<(String, u64)>::new());
        leaf.quotas.insert("B".to_string(), number(1.5));
        let err = BlueprintFlattener::new()
            .flatten(&three_level(vec![leaf]))
            .unwrap_err();
        assert!(matches!(err, BlueprintFormatError::NonIntegerQuota { .. }));

        let mut leaf = BlueprintNode::leaf("A", Vec::<(String, u64)>::new());
        leaf.quotas.insert("B".to_string(), number(3.0));
        let reqs = BlueprintFlattener::new()
            .flatten(&three_level(vec![leaf]))
            .unwrap();
        assert_eq!(reqs[0].required_count, 3);
    }

    #[test]
    fn rejects_unknown_and_duplicate_types() {
        let blueprint = three_level(vec![BlueprintNode::leaf("A", [("选择", 1)])]);
        assert!(matches!(
            BlueprintFlattener::new().flatten(&blueprint),
            Err(BlueprintFormatError::UnknownQuestionType { .. })
        ));

        let blueprint = three_level(vec![BlueprintNode::leaf(
            "A",
            [("B", 1), ("single_choice", 2)],
        )]);
        assert!(matches!(
            BlueprintFlattener::new().flatten(&blueprint),
            Err(BlueprintFormatError::DuplicateQuestionType { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_leaves_and_deep_trees() {
        let blueprint = three_level(vec![
            BlueprintNode::leaf("A", [("B", 1)]),
            BlueprintNode::leaf("A", [("C", 1)]),
        ]);
        assert_eq!(
            BlueprintFlattener::new().flatten(&blueprint),
            Err(BlueprintFormatError::DuplicateLeaf {
                leaf_code: "C-A-A".to_string()
            })
        );

        let deep = three_level(vec![BlueprintNode::branch(
            "A",
            vec![BlueprintNode::leaf("X", [("B", 1)])],
        )]);
        assert!(matches!(
            BlueprintFlattener::new().flatten(&deep),
            Err(BlueprintFormatError::TooDeep { depth: 4, .. })
        ));
        assert!(BlueprintFlattener::with_max_depth(4).flatten(&deep).is_ok());
    }

    #[test]
    fn rejects_zero_parallel_points_and_empty_codes() {
        let blueprint =
            three_level(vec![BlueprintNode::leaf("A", [("B", 1)])]).with_parallel_points(0);
        assert_eq!(
            BlueprintFlattener::new().flatten(&blueprint),
            Err(BlueprintFormatError::ZeroParallelPoints)
        );

        let blueprint = three_level(vec![BlueprintNode::leaf(" ", [("B", 1)])]);
        assert!(matches!(
            BlueprintFlattener::new().flatten(&blueprint),
            Err(BlueprintFormatError::EmptyCode { .. })
        ));
    }

    #[test]
    fn leaf_without_quotas_is_not_an_error() {
        let blueprint = three_level(vec![BlueprintNode::leaf("A", [("B", 0)])]);
        assert!(BlueprintFlattener::new()
            .flatten(&blueprint)
            .unwrap()
            .is_empty());
    }
}
