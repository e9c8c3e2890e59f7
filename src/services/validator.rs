//! 分布复核服务 - 业务能力层
//!
//! 把实际分布与展开后的抽题要求逐单元格比对，生成复核报告。
//! 复核发现的问题全部以数据形式写入报告，复核本身永远不会失败。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::PoolIndexWarning;
use crate::models::{IdGrammar, IdIssue, QuestionType, SamplingRequirement};
use crate::services::reconstructor::{percentage, ObservedDistribution};

/// 复核策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// 严格总量：实际总数必须等于要求总数，超量也视为错误
    pub strict_totals: bool,
}

/// 单条复核发现
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    MissingQuestions {
        leaf_code: String,
        type_code: QuestionType,
        required: usize,
        observed: usize,
        deficit: usize,
    },
    ExcessQuestions {
        leaf_code: String,
        type_code: QuestionType,
        required: usize,
        observed: usize,
        surplus: usize,
    },
    /// 实际出现但蓝图中没有的 (知识点, 题型)
    OffTaxonomy {
        leaf_code: String,
        type_code: QuestionType,
        count: usize,
    },
    MalformedId { id: String, issue: IdIssue },
    DuplicateId { id: String, occurrences: usize },
    UnclassifiedRecord { warning: PoolIndexWarning },
    TotalMismatch { expected: usize, observed: usize },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::MissingQuestions {
                leaf_code,
                type_code,
                required,
                observed,
                deficit,
            } => write!(
                f,
                "题量不足: {leaf_code} {type_code} 要求 {required} 道, 实际 {observed} 道, 缺 {deficit} 道"
            ),
            Finding::ExcessQuestions {
                leaf_code,
                type_code,
                required,
                observed,
                surplus,
            } => write!(
                f,
                "题量超出: {leaf_code} {type_code} 要求 {required} 道, 实际 {observed} 道, 多 {surplus} 道"
            ),
            Finding::OffTaxonomy {
                leaf_code,
                type_code,
                count,
            } => write!(f, "蓝图外题目: {leaf_code} {type_code} 共 {count} 道"),
            Finding::MalformedId { id, issue } => write!(f, "ID格式异常: {id} ({issue})"),
            Finding::DuplicateId { id, occurrences } => {
                write!(f, "ID重复: {id} 出现 {occurrences} 次")
            }
            Finding::UnclassifiedRecord { warning } => write!(f, "无法分类: {warning}"),
            Finding::TotalMismatch { expected, observed } => {
                write!(f, "总题量不符: 要求 {expected} 道, 实际 {observed} 道")
            }
        }
    }
}

/// 单元格比对结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    Exact,
    Missing,
    Excess,
    OffTaxonomy,
}

/// 交叉表中的一行（知识点 × 题型）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellRow {
    pub leaf_code: String,
    pub type_code: QuestionType,
    pub expected: usize,
    pub observed: usize,
    pub status: CellStatus,
}

/// 按题型汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRow {
    pub type_code: QuestionType,
    pub type_name: &'static str,
    pub expected: usize,
    pub observed: usize,
    pub delta: i64,
    /// 占已分类题目的百分比
    pub share: f64,
}

/// 按知识点汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafRow {
    pub leaf_code: String,
    pub expected: usize,
    pub observed: usize,
    pub delta: i64,
    pub share: f64,
}

/// 复核报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// 完全匹配的单元格 / 要求的单元格，没有要求时为 0
    pub accuracy_rate: f64,
    pub expected_total: usize,
    pub observed_total: usize,
    pub expected_cells: usize,
    pub exact_cells: usize,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub by_type: Vec<TypeRow>,
    pub by_leaf: Vec<LeafRow>,
    pub cross_tab: Vec<CellRow>,
    pub generated_at: String,
}

impl ValidationReport {
    /// 全部发现，错误在前
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.errors.iter().chain(self.warnings.iter())
    }

    /// 蓝图外题目的警告
    pub fn off_taxonomy(&self) -> impl Iterator<Item = &Finding> {
        self.warnings
            .iter()
            .filter(|f| matches!(f, Finding::OffTaxonomy { .. }))
    }

    pub fn summary(&self) -> String {
        format!(
            "{} 准确率 {:.2}% (要求 {} 道, 实际 {} 道, {} 个错误, {} 个警告)",
            if self.is_valid { "通过" } else { "未通过" },
            self.accuracy_rate * 100.0,
            self.expected_total,
            self.observed_total,
            self.errors.len(),
            self.warnings.len()
        )
    }
}

/// 分布复核服务
///
/// 职责：
/// - 逐个要求单元格比对题量（缺少为错误，超出默认为警告）
/// - 标记蓝图外的 (知识点, 题型)
/// - 检查题目 ID 格式、重复 ID 与无法分类的题目
/// - 生成按题型、按知识点以及交叉表三种统计表
pub struct Validator {
    grammar: IdGrammar,
    policy: ValidationPolicy,
}

impl Validator {
    pub fn new(grammar: IdGrammar, policy: ValidationPolicy) -> Self {
        Self { grammar, policy }
    }

    pub fn with_policy(policy: ValidationPolicy) -> Self {
        Self::new(IdGrammar::default(), policy)
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// 比对要求与实际分布
    pub fn validate(
        &self,
        expected: &[SamplingRequirement],
        observed: &ObservedDistribution,
    ) -> ValidationReport {
        let cells = merge_requirements(expected);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut cross_tab = Vec::with_capacity(cells.len());
        let mut exact_cells = 0;

        // 要求单元格，按展开顺序
        for (leaf_code, type_code, required) in &cells {
            let actual = observed.count(leaf_code, *type_code);
            let status = if actual == *required {
                exact_cells += 1;
                CellStatus::Exact
            } else if actual < *required {
                errors.push(Finding::MissingQuestions {
                    leaf_code: leaf_code.clone(),
                    type_code: *type_code,
                    required: *required,
                    observed: actual,
                    deficit: required - actual,
                });
                CellStatus::Missing
            } else {
                let finding = Finding::ExcessQuestions {
                    leaf_code: leaf_code.clone(),
                    type_code: *type_code,
                    required: *required,
                    observed: actual,
                    surplus: actual - required,
                };
                if self.policy.strict_totals {
                    errors.push(finding);
                } else {
                    warnings.push(finding);
                }
                CellStatus::Excess
            };
            cross_tab.push(CellRow {
                leaf_code: leaf_code.clone(),
                type_code: *type_code,
                expected: *required,
                observed: actual,
                status,
            });
        }

        // 蓝图外单元格
        let expected_keys: HashSet<(&str, QuestionType)> = cells
            .iter()
            .map(|(leaf, t, _)| (leaf.as_str(), *t))
            .collect();
        for (leaf_code, type_code, count) in observed.iter_cells() {
            if expected_keys.contains(&(leaf_code, type_code)) {
                continue;
            }
            warnings.push(Finding::OffTaxonomy {
                leaf_code: leaf_code.to_string(),
                type_code,
                count,
            });
            cross_tab.push(CellRow {
                leaf_code: leaf_code.to_string(),
                type_code,
                expected: 0,
                observed: count,
                status: CellStatus::OffTaxonomy,
            });
        }

        warnings.extend(self.check_ids(observed));
        warnings.extend(
            observed
                .duplicate_ids
                .iter()
                .map(|(id, n)| Finding::DuplicateId {
                    id: id.clone(),
                    occurrences: *n,
                }),
        );
        warnings.extend(
            observed
                .unclassified
                .iter()
                .cloned()
                .map(|warning| Finding::UnclassifiedRecord { warning }),
        );

        let expected_total: usize = cells.iter().map(|(_, _, n)| n).sum();
        let observed_total = observed.total_records;
        if self.policy.strict_totals && expected_total != observed_total {
            errors.push(Finding::TotalMismatch {
                expected: expected_total,
                observed: observed_total,
            });
        }

        let accuracy_rate = if cells.is_empty() {
            0.0
        } else {
            exact_cells as f64 / cells.len() as f64
        };
        let is_valid = accuracy_rate == 1.0 && errors.is_empty();

        let report = ValidationReport {
            is_valid,
            accuracy_rate,
            expected_total,
            observed_total,
            expected_cells: cells.len(),
            exact_cells,
            by_type: type_rows(&cells, observed),
            by_leaf: leaf_rows(&cells, observed),
            cross_tab,
            errors,
            warnings,
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        if report.is_valid {
            info!("✓ 复核{}", report.summary());
        } else {
            warn!("⚠️ 复核{}", report.summary());
        }
        report
    }

    /// 每个不同的 ID 只检查一次，按首次出现的顺序
    fn check_ids(&self, observed: &ObservedDistribution) -> Vec<Finding> {
        let mut seen = HashSet::new();
        observed
            .ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| {
                self.grammar.check(id).map(|issue| Finding::MalformedId {
                    id: id.clone(),
                    issue,
                })
            })
            .collect()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::with_policy(ValidationPolicy::default())
    }
}

/// 合并同一单元格的多条要求，保持首次出现的顺序
fn merge_requirements(expected: &[SamplingRequirement]) -> Vec<(String, QuestionType, usize)> {
    let mut cells: Vec<(String, QuestionType, usize)> = Vec::with_capacity(expected.len());
    let mut position: HashMap<(&str, QuestionType), usize> = HashMap::new();

    for req in expected {
        match position.get(&(req.leaf_code.as_str(), req.type_code)) {
            Some(&i) => cells[i].2 += req.required_count,
            None => {
                position.insert((req.leaf_code.as_str(), req.type_code), cells.len());
                cells.push((req.leaf_code.clone(), req.type_code, req.required_count));
            }
        }
    }
    cells
}

fn delta(observed: usize, expected: usize) -> i64 {
    observed as i64 - expected as i64
}

fn type_rows(
    cells: &[(String, QuestionType, usize)],
    observed: &ObservedDistribution,
) -> Vec<TypeRow> {
    let mut expected: BTreeMap<QuestionType, usize> = BTreeMap::new();
    for (_, t, n) in cells {
        *expected.entry(*t).or_default() += n;
    }
    let classified = observed.classified_total();

    QuestionType::ALL
        .iter()
        .copied()
        .filter(|t| expected.contains_key(t) || observed.by_type.contains_key(t))
        .map(|t| {
            let exp = expected.get(&t).copied().unwrap_or(0);
            let obs = observed.by_type.get(&t).copied().unwrap_or(0);
            TypeRow {
                type_code: t,
                type_name: t.name(),
                expected: exp,
                observed: obs,
                delta: delta(obs, exp),
                share: percentage(obs, classified),
            }
        })
        .collect()
}

fn leaf_rows(
    cells: &[(String, QuestionType, usize)],
    observed: &ObservedDistribution,
) -> Vec<LeafRow> {
    let mut order: Vec<&str> = Vec::new();
    let mut expected: HashMap<&str, usize> = HashMap::new();
    for (leaf, _, n) in cells {
        let slot = expected.entry(leaf.as_str()).or_insert_with(|| {
            order.push(leaf.as_str());
            0
        });
        *slot += n;
    }
    for leaf in observed.by_leaf.keys() {
        if !expected.contains_key(leaf.as_str()) {
            order.push(leaf.as_str());
        }
    }
    let classified = observed.classified_total();

    order
        .into_iter()
        .map(|leaf| {
            let exp = expected.get(leaf).copied().unwrap_or(0);
            let obs = observed.by_leaf.get(leaf).copied().unwrap_or(0);
            LeafRow {
                leaf_code: leaf.to_string(),
                expected: exp,
                observed: obs,
                delta: delta(obs, exp),
                share: percentage(obs, classified),
            }
        })
        .collect()
}
