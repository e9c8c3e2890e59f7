//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::services::ValidationReport;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，未设置时按 `verbose` 选择 debug / info。
/// 重复调用时忽略。
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(command: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 题库组题与复核 - {}", command);
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录批量复核开始信息
pub fn log_batch_start(total: usize, requirement_count: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始批量复核: 共 {} 份", total);
    info!("📋 抽题要求: {} 条", requirement_count);
    info!("{}", "=".repeat(60));
}

/// 记录单份复核结果
pub fn log_artifact_result(index: usize, total: usize, name: &str, report: &ValidationReport) {
    let mark = if report.is_valid { "✅" } else { "❌" };
    info!(
        "{} [{}/{}] {}: {}",
        mark,
        index,
        total,
        truncate_text(name, 40),
        report.summary()
    );
}

/// 打印最终统计信息
pub fn print_final_stats(passed: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部复核完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 通过: {}/{}", passed, total);
    info!("❌ 未通过: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
