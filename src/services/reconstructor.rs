//! 分布统计服务 - 业务能力层
//!
//! 从任意题目集合（本次组题结果、已有题库、已组好的试卷）重新统计
//! (知识点, 题型) 分布。只读取题目声明的 `leaf_knowledge_code` / `type_code`，
//! 从不解析 ID 字符串。

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::PoolIndexWarning;
use crate::models::{QuestionRecord, QuestionType};
use crate::services::sampler::GeneratedSet;

/// 实际分布
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObservedDistribution {
    /// 输入的题目总数（含无法分类的题目）
    pub total_records: usize,
    /// 知识点 → 题型 → 题量
    pub cells: BTreeMap<String, BTreeMap<QuestionType, usize>>,
    pub by_leaf: BTreeMap<String, usize>,
    pub by_type: BTreeMap<QuestionType, usize>,
    /// 按输入顺序的题目 ID
    pub ids: Vec<String>,
    /// 出现多次的 ID 及出现次数
    pub duplicate_ids: BTreeMap<String, usize>,
    /// 缺少或无法识别分类字段的题目
    pub unclassified: Vec<PoolIndexWarning>,
}

impl ObservedDistribution {
    /// 某单元格的题量
    pub fn count(&self, leaf_code: &str, question_type: QuestionType) -> usize {
        self.cells
            .get(leaf_code)
            .and_then(|by_type| by_type.get(&question_type))
            .copied()
            .unwrap_or(0)
    }

    /// 成功分类的题目数
    pub fn classified_total(&self) -> usize {
        self.by_type.values().sum()
    }

    /// 按 (知识点, 题型) 遍历所有单元格
    pub fn iter_cells(&self) -> impl Iterator<Item = (&str, QuestionType, usize)> + '_ {
        self.cells.iter().flat_map(|(leaf, by_type)| {
            by_type
                .iter()
                .map(move |(t, count)| (leaf.as_str(), *t, *count))
        })
    }

    /// 某知识点占已分类题目的百分比
    pub fn leaf_share(&self, leaf_code: &str) -> f64 {
        percentage(
            self.by_leaf.get(leaf_code).copied().unwrap_or(0),
            self.classified_total(),
        )
    }

    /// 某题型占已分类题目的百分比
    pub fn type_share(&self, question_type: QuestionType) -> f64 {
        percentage(
            self.by_type.get(&question_type).copied().unwrap_or(0),
            self.classified_total(),
        )
    }
}

pub(crate) fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// 分布统计服务
pub struct DistributionReconstructor;

impl DistributionReconstructor {
    pub fn new() -> Self {
        Self
    }

    /// 统计任意题目集合
    pub fn reconstruct<'r, I>(&self, records: I) -> ObservedDistribution
    where
        I: IntoIterator<Item = &'r QuestionRecord>,
    {
        let mut observed = ObservedDistribution::default();
        let mut id_counts: BTreeMap<&str, usize> = BTreeMap::new();

        for record in records {
            observed.total_records += 1;
            observed.ids.push(record.id.clone());
            *id_counts.entry(record.id.as_str()).or_default() += 1;

            let (leaf_code, question_type) = match record.classify() {
                Ok(cell) => cell,
                Err(warning) => {
                    observed.unclassified.push(warning);
                    continue;
                }
            };

            *observed.by_type.entry(question_type).or_default() += 1;
            *observed.by_leaf.entry(leaf_code.clone()).or_default() += 1;
            *observed
                .cells
                .entry(leaf_code)
                .or_default()
                .entry(question_type)
                .or_default() += 1;
        }

        observed.duplicate_ids = id_counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(id, n)| (id.to_string(), n))
            .collect();

        debug!(
            "统计完成: {} 道题目, {} 个知识点, {} 种题型, {} 道无法分类",
            observed.total_records,
            observed.by_leaf.len(),
            observed.by_type.len(),
            observed.unclassified.len()
        );
        observed
    }

    /// 统计本次组题结果
    pub fn reconstruct_set(&self, set: &GeneratedSet<'_>) -> ObservedDistribution {
        self.reconstruct(set.records().iter().copied())
    }
}

impl Default for DistributionReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, t: &str, leaf: &str) -> QuestionRecord {
        QuestionRecord {
            id: id.to_string(),
            type_code: Some(t.to_string()),
            leaf_knowledge_code: Some(leaf.to_string()),
            stem: String::new(),
            answer: String::new(),
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn counts_by_cell_leaf_and_type() {
        let records = vec![
            record("B-A-B-C-001-001", "B", "A-B-C"),
            record("B-A-B-C-001-002", "B（单选题）", "A-B-C"),
            record("C-A-B-C-001-001", "true_false", "A-B-C"),
            record("C-A-B-D-001-001", "C", "A－B－D"),
        ];
        let observed = DistributionReconstructor::new().reconstruct(&records);

        assert_eq!(observed.total_records, 4);
        assert_eq!(observed.count("A-B-C", QuestionType::SingleChoice), 2);
        assert_eq!(observed.count("A-B-C", QuestionType::TrueFalse), 1);
        assert_eq!(observed.count("A-B-D", QuestionType::TrueFalse), 1);
        assert_eq!(observed.by_leaf["A-B-C"], 3);
        assert_eq!(observed.by_type[&QuestionType::TrueFalse], 2);
        assert!((observed.leaf_share("A-B-C") - 75.0).abs() < 1e-9);
        assert!((observed.type_share(QuestionType::SingleChoice) - 50.0).abs() < 1e-9);
        assert_eq!(observed.iter_cells().count(), 3);
    }

    #[test]
    fn uses_declared_fields_not_id_segments() {
        // ID 中写的是 A-B-C，但声明的知识点是 X-Y-Z
        let records = vec![record("B-A-B-C-001-001#dup", "B", "X-Y-Z")];
        let observed = DistributionReconstructor::new().reconstruct(&records);
        assert_eq!(observed.count("X-Y-Z", QuestionType::SingleChoice), 1);
        assert_eq!(observed.count("A-B-C", QuestionType::SingleChoice), 0);
    }

    #[test]
    fn keeps_unclassified_and_duplicate_records_visible() {
        let mut missing_leaf = record("q2", "B", "");
        missing_leaf.leaf_knowledge_code = None;
        let records = vec![
            record("q1", "unknown", "A-B-C"),
            missing_leaf,
            record("q3", "B", "A-B-C"),
            record("q3", "B", "A-B-C"),
        ];
        let observed = DistributionReconstructor::new().reconstruct(&records);

        assert_eq!(observed.total_records, 4);
        assert_eq!(observed.classified_total(), 2);
        assert_eq!(observed.unclassified.len(), 2);
        assert_eq!(observed.duplicate_ids.get("q3"), Some(&2));
    }

    #[test]
    fn reconstruct_is_idempotent() {
        let records = vec![
            record("q1", "B", "A-B-C"),
            record("q2", "G", "A-B-D"),
            record("q3", "x", "A-B-D"),
        ];
        let reconstructor = DistributionReconstructor::new();
        assert_eq!(
            reconstructor.reconstruct(&records),
            reconstructor.reconstruct(&records)
        );
    }

    #[test]
    fn empty_input_has_zero_shares() {
        let observed = DistributionReconstructor::new().reconstruct(&Vec::<QuestionRecord>::new());
        assert_eq!(observed.leaf_share("A-B-C"), 0.0);
        assert_eq!(observed.classified_total(), 0);
    }
}
