//! 抽题服务 - 业务能力层
//!
//! 按展开后的抽题要求从索引中无放回随机抽题。
//! 结果要么完整满足全部要求，要么返回汇总了所有缺口的错误，不存在部分结果。

use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PaperGenerationError, Shortage};
use crate::models::{QuestionRecord, SamplingRequirement};
use crate::services::taxonomy_index::TaxonomyIndex;
use crate::workflow::RunCtx;

/// 一次组题抽出的题目，按抽取顺序排列，ID 不重复
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSet<'a> {
    records: Vec<&'a QuestionRecord>,
}

/// 组题结果的持久化行，带有组题批次号
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedRow {
    pub run_id: String,
    pub order: usize,
    pub question_id: String,
}

impl<'a> GeneratedSet<'a> {
    pub fn records(&self) -> &[&'a QuestionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按顺序返回题目 ID
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    /// 生成持久化行（序号从 1 开始）
    pub fn rows(&self, ctx: &RunCtx) -> Vec<GeneratedRow> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| GeneratedRow {
                run_id: ctx.run_id.clone(),
                order: i + 1,
                question_id: r.id.clone(),
            })
            .collect()
    }

    /// 复制出完整题目，便于写出
    pub fn to_records(&self) -> Vec<QuestionRecord> {
        self.records.iter().map(|r| (*r).clone()).collect()
    }
}

/// 抽题服务
///
/// 职责：
/// - 每条要求等概率、无放回地抽取恰好 `required_count` 道题
/// - 同一次组题中一道题只会被抽中一次（按遍历顺序先到先得）
/// - 一次遍历收集全部缺口，任何缺口都使整次组题失败
/// - 随机源由调用方注入
pub struct Sampler;

impl Sampler {
    pub fn new() -> Self {
        Self
    }

    pub fn generate<'a, R>(
        &self,
        requirements: &[SamplingRequirement],
        index: &TaxonomyIndex<'a>,
        rng: &mut R,
    ) -> Result<GeneratedSet<'a>, PaperGenerationError>
    where
        R: Rng + ?Sized,
    {
        let mut drawn: Vec<&'a QuestionRecord> = Vec::new();
        let mut taken: HashSet<&'a str> = HashSet::new();
        let mut shortages = Vec::new();

        for requirement in requirements {
            // 题库中重复的 ID 属于调用方错误，这里只保证输出不重复
            let mut seen: HashSet<&'a str> = HashSet::new();
            let candidates: Vec<&'a QuestionRecord> = index
                .lookup(&requirement.leaf_code, requirement.type_code)
                .iter()
                .copied()
                .filter(|r| !taken.contains(r.id.as_str()) && seen.insert(r.id.as_str()))
                .collect();

            let available = candidates.len();
            if available < requirement.required_count {
                warn!(
                    "⚠️ 知识点 {} 题型 {} 题量不足: 需要 {} 道, 可用 {} 道",
                    requirement.leaf_code,
                    requirement.type_code,
                    requirement.required_count,
                    available
                );
                shortages.push(Shortage {
                    leaf_code: requirement.leaf_code.clone(),
                    type_code: requirement.type_code,
                    required: requirement.required_count,
                    available,
                });
                continue;
            }

            // 即使已有缺口也继续抽题：后续要求的可用量要扣除前面已占用的题目
            for i in rand::seq::index::sample(&mut *rng, available, requirement.required_count) {
                let record = candidates[i];
                taken.insert(record.id.as_str());
                drawn.push(record);
            }
            debug!(
                "✓ {} 抽取 {} / {} 道",
                requirement, requirement.required_count, available
            );
        }

        if !shortages.is_empty() {
            return Err(PaperGenerationError { shortages });
        }

        info!("✓ 抽题完成: {} 条要求, 共 {} 道题目", requirements.len(), drawn.len());
        Ok(GeneratedSet { records: drawn })
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}
