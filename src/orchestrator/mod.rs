//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量复核和全局统计。
//!
//! ## 层次关系
//!
//! ```text
//! batch_validator (处理多份题目集合)
//!     ↓
//! services::{DistributionReconstructor, Validator} (处理单份)
//!     ↓
//! models (题目 / 蓝图 / 抽题要求)
//! ```
//!
//! 单次组题流程见 `workflow::GenerationFlow`。

pub mod batch_validator;

pub use batch_validator::{ArtifactResult, BatchSummary, BatchValidator};
