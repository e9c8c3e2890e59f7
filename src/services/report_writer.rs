//! 报告写入服务 - 业务能力层
//!
//! 只负责把复核报告和组题结果写到磁盘，不关心流程。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::services::sampler::{GeneratedRow, GeneratedSet};
use crate::services::validator::ValidationReport;
use crate::workflow::RunCtx;

/// 问题日志文件名
pub const ISSUES_FILE: &str = "issues.txt";

/// 组题结果文件内容
#[derive(Debug, Serialize)]
struct GeneratedArtifact<'a> {
    run_id: &'a str,
    bank_name: &'a str,
    seed: u64,
    rows: Vec<GeneratedRow>,
    questions: Vec<crate::models::QuestionRecord>,
}

/// 报告写入服务
///
/// 职责：
/// - 复核报告写为 `{目录}/{前缀}_{YYYYmmdd_HHMMSS}.json`
/// - 每条复核发现追加一行到问题日志
/// - 组题结果连同批次号写为 `{输出目录}/{run_id}.json`
pub struct ReportWriter {
    report_dir: PathBuf,
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(report_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// 写入复核报告，返回报告文件路径
    pub async fn write_report(&self, prefix: &str, report: &ValidationReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.report_dir)
            .await
            .with_context(|| format!("无法创建报告目录: {}", self.report_dir.display()))?;

        let filename = format!("{}_{}.json", prefix, Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.report_dir.join(filename);
        let json = serde_json::to_string_pretty(report).context("序列化复核报告失败")?;
        fs::write(&path, json)
            .await
            .with_context(|| format!("写入复核报告失败: {}", path.display()))?;

        self.append_issues(prefix, report).await?;
        info!("✓ 复核报告已保存: {}", path.display());
        Ok(path)
    }

    /// 追加问题日志，没有发现时不创建文件
    pub async fn append_issues(&self, prefix: &str, report: &ValidationReport) -> Result<()> {
        let lines: String = report
            .errors
            .iter()
            .map(|f| ("ERROR", f))
            .chain(report.warnings.iter().map(|f| ("WARN", f)))
            .map(|(level, f)| format!("[{}] {} | {} | {}\n", report.generated_at, prefix, level, f))
            .collect();
        if lines.is_empty() {
            return Ok(());
        }

        let path = self.report_dir.join(ISSUES_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("无法打开问题日志: {}", path.display()))?;
        file.write_all(lines.as_bytes())
            .await
            .with_context(|| format!("写入问题日志失败: {}", path.display()))?;

        debug!(
            "问题日志追加 {} 条: {}",
            report.errors.len() + report.warnings.len(),
            path.display()
        );
        Ok(())
    }

    /// 写入组题结果，返回文件路径
    pub async fn write_generated(&self, ctx: &RunCtx, set: &GeneratedSet<'_>) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("无法创建输出目录: {}", self.output_dir.display()))?;

        let artifact = GeneratedArtifact {
            run_id: &ctx.run_id,
            bank_name: &ctx.bank_name,
            seed: ctx.seed,
            rows: set.rows(ctx),
            questions: set.to_records(),
        };
        let path = self.output_dir.join(format!("{}.json", ctx.run_id));
        let json = serde_json::to_string_pretty(&artifact).context("序列化组题结果失败")?;
        fs::write(&path, json)
            .await
            .with_context(|| format!("写入组题结果失败: {}", path.display()))?;

        info!("✓ 组题结果已保存: {} ({} 道)", path.display(), set.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionRecord, QuestionType, SamplingRequirement};
    use crate::services::reconstructor::DistributionReconstructor;
    use crate::services::validator::Validator;

    fn failing_report() -> ValidationReport {
        let reqs = vec![SamplingRequirement::new("C-A-A", QuestionType::TrueFalse, 2)];
        let records = vec![QuestionRecord::new("bad-id", QuestionType::TrueFalse, "C-A-A")];
        let observed = DistributionReconstructor::new().reconstruct(&records);
        Validator::default().validate(&reqs, &observed)
    }

    #[test]
    fn writes_timestamped_report_and_issue_lines() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports"), dir.path().join("out"));
        let report = failing_report();

        let path = tokio_test::block_on(writer.write_report("paper", &report)).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("paper_") && name.ends_with(".json"));
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["is_valid"], false);
        assert_eq!(saved["errors"][0]["kind"], "missing_questions");

        let issues = std::fs::read_to_string(writer.report_dir().join(ISSUES_FILE)).unwrap();
        let lines: Vec<_> = issues.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ERROR"));
        assert!(lines[1].contains("bad-id"));
    }

    #[test]
    fn clean_report_creates_no_issue_log() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), dir.path());
        let reqs = vec![SamplingRequirement::new("C-A-A", QuestionType::TrueFalse, 1)];
        let records = vec![QuestionRecord::new(
            "C-C-A-A-001-001",
            QuestionType::TrueFalse,
            "C-A-A",
        )];
        let report = Validator::default()
            .validate(&reqs, &DistributionReconstructor::new().reconstruct(&records));

        tokio_test::block_on(writer.write_report("bank", &report)).unwrap();
        assert!(!dir.path().join(ISSUES_FILE).exists());
    }
}
