//! 知识点索引服务 - 业务能力层
//!
//! 把扁平的题库按 (三级知识点, 题型) 建立查找表。
//! 索引由调用方构造并持有，不存在进程级缓存。

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::PoolIndexWarning;
use crate::models::{QuestionRecord, QuestionType};

/// (知识点, 题型) → 候选题目
///
/// 每个桶内保持题库中的原始顺序，保证同一随机种子下抽题可复现。
#[derive(Debug, Default)]
pub struct TaxonomyIndex<'a> {
    buckets: HashMap<String, HashMap<QuestionType, Vec<&'a QuestionRecord>>>,
    warnings: Vec<PoolIndexWarning>,
    indexed: usize,
}

impl<'a> TaxonomyIndex<'a> {
    /// 为题库建立索引
    pub fn build<I>(pool: I) -> Self
    where
        I: IntoIterator<Item = &'a QuestionRecord>,
    {
        let mut index = Self::default();

        for record in pool {
            let (leaf_code, question_type) = match record.classify() {
                Ok(cell) => cell,
                Err(warning) => {
                    index.warnings.push(warning);
                    continue;
                }
            };

            index
                .buckets
                .entry(leaf_code)
                .or_default()
                .entry(question_type)
                .or_default()
                .push(record);
            index.indexed += 1;
        }

        debug!(
            "索引完成: {} 道题目, {} 个知识点, {} 条警告",
            index.indexed,
            index.buckets.len(),
            index.warnings.len()
        );
        if !index.warnings.is_empty() {
            warn!("⚠️ 题库中有 {} 道题目缺少分类字段，已跳过", index.warnings.len());
        }

        index
    }

    /// 查找某知识点某题型的候选题目
    pub fn lookup(&self, leaf_code: &str, question_type: QuestionType) -> &[&'a QuestionRecord] {
        self.buckets
            .get(leaf_code)
            .and_then(|by_type| by_type.get(&question_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 某知识点某题型的候选题目数量
    pub fn available(&self, leaf_code: &str, question_type: QuestionType) -> usize {
        self.lookup(leaf_code, question_type).len()
    }

    /// 被跳过的题目
    pub fn warnings(&self) -> &[PoolIndexWarning] {
        &self.warnings
    }

    /// 成功建立索引的题目数
    pub fn indexed_count(&self) -> usize {
        self.indexed
    }

    /// 索引中的知识点数
    pub fn leaf_count(&self) -> usize {
        self.buckets.len()
    }
}
