//! # Question Bank Engine
//!
//! 按蓝图组题、并对任意题目集合复核题量分布的引擎
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 题目、题型、蓝图、抽题要求、题目 ID 格式
//! - `models/loaders` - 题库与蓝图文件加载（调用方 I/O）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 每个文件只提供一种能力，不关心流程
//! - `BlueprintFlattener` - 把知识点树展开为扁平的抽题要求
//! - `TaxonomyIndex` - (知识点, 题型) 查找表
//! - `Sampler` - 无放回随机抽题，缺口一次性汇总
//! - `DistributionReconstructor` - 从题目集合重新统计分布
//! - `Validator` - 比对要求与实际分布，生成复核报告
//! - `BankSynthesizer` - 生成样例题库
//! - `ReportWriter` - 写报告与组题结果
//!
//! ### ③ 流程层（Workflow）
//! - `RunCtx` - 组题批次上下文（批次号 + 种子）
//! - `GenerationFlow` - 展开 → 索引 → 抽题 → 统计 → 复核 → 提交或丢弃
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_validator` - 批量复核多份题目集合
//!
//! 核心算法全部是同步的纯计算；只有加载与写出使用 tokio 异步 I/O。

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{
    AppError, AppResult, BlueprintFormatError, PaperGenerationError, PoolIndexWarning, Shortage,
};
pub use models::{
    Blueprint, BlueprintNode, IdGrammar, IdIssue, QuestionRecord, QuestionType,
    SamplingRequirement,
};
pub use orchestrator::{BatchSummary, BatchValidator};
pub use services::{
    BankSynthesizer, BlueprintFlattener, DistributionReconstructor, Finding, GeneratedSet,
    ObservedDistribution, ReportWriter, Sampler, TaxonomyIndex, ValidationPolicy,
    ValidationReport, Validator,
};
pub use workflow::{GenerationFlow, GenerationOutcome, RunCtx};
