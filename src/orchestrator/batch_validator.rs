//! 批量复核器 - 编排层
//!
//! ## 职责
//!
//! 用同一份抽题要求复核多份题目集合（题库文件、已组好的试卷），
//! 汇总每一份的结论并输出全局统计。
//!
//! ## 设计特点
//!
//! - **顶层编排**：不关心单份复核的细节，委托给 services
//! - **逐份独立**：一份复核失败不影响其它份
//! - **I/O 在边界**：加载与写报告只发生在 `validate_folder` 中

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::models::{load_pools_in_folder, QuestionRecord, SamplingRequirement};
use crate::services::{DistributionReconstructor, ReportWriter, ValidationReport, Validator};
use crate::utils::logging::{log_artifact_result, log_batch_start, print_final_stats};

/// 单份复核结果
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactResult {
    pub name: String,
    pub is_valid: bool,
    pub accuracy_rate: f64,
    pub expected_total: usize,
    pub observed_total: usize,
    /// 实际出现的知识点数
    pub leaf_count: usize,
    /// 实际出现的题型数
    pub type_count: usize,
    pub report: ValidationReport,
}

/// 批量复核汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub artifacts: Vec<ArtifactResult>,
}

impl BatchSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    fn push(&mut self, result: ArtifactResult) {
        self.total += 1;
        if result.is_valid {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.artifacts.push(result);
    }
}

/// 批量复核器
pub struct BatchValidator {
    reconstructor: DistributionReconstructor,
    validator: Validator,
}

impl BatchValidator {
    pub fn new(validator: Validator) -> Self {
        Self {
            reconstructor: DistributionReconstructor::new(),
            validator,
        }
    }

    /// 复核多份命名的题目集合
    pub fn validate_all<S>(
        &self,
        requirements: &[SamplingRequirement],
        artifacts: &[(S, Vec<QuestionRecord>)],
    ) -> BatchSummary
    where
        S: AsRef<str>,
    {
        log_batch_start(artifacts.len(), requirements.len());
        let mut summary = BatchSummary::default();

        for (i, (name, records)) in artifacts.iter().enumerate() {
            let result = self.validate_one(name.as_ref(), requirements, records);
            log_artifact_result(i + 1, artifacts.len(), &result.name, &result.report);
            summary.push(result);
        }

        print_final_stats(summary.passed, summary.failed, summary.total);
        summary
    }

    /// 复核单份题目集合
    pub fn validate_one(
        &self,
        name: &str,
        requirements: &[SamplingRequirement],
        records: &[QuestionRecord],
    ) -> ArtifactResult {
        let observed = self.reconstructor.reconstruct(records);
        let report = self.validator.validate(requirements, &observed);
        ArtifactResult {
            name: name.to_string(),
            is_valid: report.is_valid,
            accuracy_rate: report.accuracy_rate,
            expected_total: report.expected_total,
            observed_total: report.observed_total,
            leaf_count: observed.by_leaf.len(),
            type_count: observed.by_type.len(),
            report,
        }
    }

    /// 加载目录下的全部题目文件并逐份复核，可选写出每份报告
    pub async fn validate_folder(
        &self,
        requirements: &[SamplingRequirement],
        folder: &Path,
        writer: Option<&ReportWriter>,
    ) -> Result<BatchSummary> {
        let artifacts = load_pools_in_folder(folder)
            .await
            .with_context(|| format!("无法加载目录: {}", folder.display()))?;
        if artifacts.is_empty() {
            warn!("⚠️ 目录 {} 中没有可复核的文件", folder.display());
            return Ok(BatchSummary::default());
        }
        info!("✓ 找到 {} 份待复核的题目集合", artifacts.len());

        let summary = self.validate_all(requirements, &artifacts);

        if let Some(writer) = writer {
            for result in &summary.artifacts {
                writer.write_report(&result.name, &result.report).await?;
            }
        }
        Ok(summary)
    }
}

impl Default for BatchValidator {
    fn default() -> Self {
        Self::new(Validator::default())
    }
}
