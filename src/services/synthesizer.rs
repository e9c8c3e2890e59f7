//! 样例题库生成服务 - 业务能力层
//!
//! 按蓝图生成恰好满足题量要求的虚拟题库，用于演示与测试。

use rand::Rng;
use serde_json::json;
use tracing::info;

use crate::error::BlueprintFormatError;
use crate::models::{Blueprint, QuestionRecord, QuestionType};
use crate::services::blueprint_flattener::BlueprintFlattener;

/// 样例题库生成器
pub struct BankSynthesizer {
    flattener: BlueprintFlattener,
}

impl BankSynthesizer {
    pub fn new() -> Self {
        Self {
            flattener: BlueprintFlattener::new(),
        }
    }

    /// 生成题库
    ///
    /// 每个 (知识点, 题型) 单元格按并行知识点逐个生成，
    /// ID 为 `{题型}-{知识点}-{并行点序号:03}-{题目序号:03}`。
    pub fn synthesize<R>(
        &self,
        blueprint: &Blueprint,
        rng: &mut R,
    ) -> Result<Vec<QuestionRecord>, BlueprintFormatError>
    where
        R: Rng + ?Sized,
    {
        let requirements = self.flattener.flatten(blueprint)?;
        // flatten 已保证 parallel_points > 0
        let points = blueprint.parallel_points as usize;
        let mut records = Vec::new();

        for req in &requirements {
            let per_point = req.required_count / points;
            for point in 1..=points {
                for seq in 1..=per_point {
                    records.push(synthesize_question(
                        req.type_code,
                        &req.leaf_code,
                        point,
                        seq,
                        rng,
                    ));
                }
            }
        }

        info!(
            "✓ 样例题库生成完成: {} 条要求, 共 {} 道题目",
            requirements.len(),
            records.len()
        );
        Ok(records)
    }
}

impl Default for BankSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

fn synthesize_question<R>(
    question_type: QuestionType,
    leaf_code: &str,
    point: usize,
    seq: usize,
    rng: &mut R,
) -> QuestionRecord
where
    R: Rng + ?Sized,
{
    let id = format!("{}-{leaf_code}-{point:03}-{seq:03}", question_type.code());
    let difficulty = (rng.gen_range(0.2..=0.8_f64) * 100.0).round() / 100.0;
    let score = match question_type {
        QuestionType::SingleChoice | QuestionType::TrueFalse => 1,
        _ => 2,
    };
    let options: Vec<_> = match question_type {
        QuestionType::SingleChoice | QuestionType::MultipleChoice => ["A", "B", "C", "D"]
            .iter()
            .map(|key| json!({ "key": key, "text": format!("选项{key} for {id}") }))
            .collect(),
        _ => Vec::new(),
    };
    let answer = match question_type {
        QuestionType::MultipleChoice => "A,B",
        QuestionType::TrueFalse => "正确",
        _ => "A",
    };

    let mut record = QuestionRecord::new(id.clone(), question_type, leaf_code);
    record.stem = format!(
        "这是一道关于知识点 {leaf_code} 的{}。ID: {id}",
        question_type.name()
    );
    record.answer = answer.to_string();
    record.metadata = json!({
        "type_name": question_type.name(),
        "knowledge_point_parallel": format!("{leaf_code}-{point:03}"),
        "options": options,
        "explanation": format!("这是对题目 {id} 的详细解析。"),
        "difficulty": difficulty,
        "score": score,
    });
    record
}
