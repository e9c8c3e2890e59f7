//! 组题流程 - 流程层
//!
//! 核心职责：定义"一次组题"的完整流程
//!
//! 流程顺序：
//! 1. 展开蓝图（结构错误立即返回）
//! 2. 为题库快照建立索引（记录被跳过的题目）
//! 3. 抽题（任何缺口都使整次组题失败）
//! 4. 重新统计分布并复核
//! 5. 复核通过则提交，否则整体丢弃

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppResult, ConfigError, PoolIndexWarning};
use crate::models::{Blueprint, QuestionRecord, SamplingRequirement};
use crate::services::{
    BlueprintFlattener, DistributionReconstructor, GeneratedSet, Sampler, TaxonomyIndex,
    ValidationReport, Validator,
};
use crate::workflow::run_ctx::RunCtx;

/// 组题结论
#[derive(Debug)]
pub enum GenerationOutcome<'a> {
    /// 复核通过，可以持久化
    Committed {
        set: GeneratedSet<'a>,
        report: ValidationReport,
    },
    /// 复核未通过，结果已丢弃
    Discarded { report: ValidationReport },
}

impl GenerationOutcome<'_> {
    pub fn report(&self) -> &ValidationReport {
        match self {
            GenerationOutcome::Committed { report, .. } => report,
            GenerationOutcome::Discarded { report } => report,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, GenerationOutcome::Committed { .. })
    }
}

/// 一次组题的完整结果
#[derive(Debug)]
pub struct GenerationRun<'a> {
    pub requirements: Vec<SamplingRequirement>,
    /// 题库中因缺少分类字段被跳过的题目
    pub pool_warnings: Vec<PoolIndexWarning>,
    pub outcome: GenerationOutcome<'a>,
}

/// 组题流程
///
/// - 编排 展开 → 索引 → 抽题 → 统计 → 复核
/// - 不做任何 I/O，题库快照与持久化由调用方负责
/// - 只依赖业务能力（services）
pub struct GenerationFlow {
    flattener: BlueprintFlattener,
    sampler: Sampler,
    reconstructor: DistributionReconstructor,
    validator: Validator,
}

impl GenerationFlow {
    /// 按配置创建组题流程
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::from_parts(
            BlueprintFlattener::with_max_depth(config.max_levels),
            Validator::new(config.id_grammar()?, config.validation_policy()),
        ))
    }

    pub fn from_parts(flattener: BlueprintFlattener, validator: Validator) -> Self {
        Self {
            flattener,
            sampler: Sampler::new(),
            reconstructor: DistributionReconstructor::new(),
            validator,
        }
    }

    /// 执行一次组题，随机源由批次种子决定
    pub fn run<'a>(
        &self,
        blueprint: &Blueprint,
        pool: &'a [QuestionRecord],
        ctx: &RunCtx,
    ) -> AppResult<GenerationRun<'a>> {
        info!("{} 开始组题: 蓝图 {}", ctx, blueprint.name);
        let requirements = self.flattener.flatten(blueprint)?;
        let mut rng = StdRng::seed_from_u64(ctx.seed);
        self.run_requirements(requirements, pool, &mut rng)
    }

    /// 按已展开的要求组题
    pub fn run_requirements<'a, R>(
        &self,
        requirements: Vec<SamplingRequirement>,
        pool: &'a [QuestionRecord],
        rng: &mut R,
    ) -> AppResult<GenerationRun<'a>>
    where
        R: Rng + ?Sized,
    {
        let index = TaxonomyIndex::build(pool);
        let pool_warnings = index.warnings().to_vec();
        for w in &pool_warnings {
            warn!("⚠️ 跳过题目: {}", w);
        }

        let set = self.sampler.generate(&requirements, &index, rng)?;
        let observed = self.reconstructor.reconstruct_set(&set);
        let report = self.validator.validate(&requirements, &observed);

        let outcome = if report.is_valid {
            info!("✓ 组题完成并通过复核: {} 道题目", set.len());
            GenerationOutcome::Committed { set, report }
        } else {
            warn!("⚠️ 组题结果未通过复核，已丢弃");
            GenerationOutcome::Discarded { report }
        };

        Ok(GenerationRun {
            requirements,
            pool_warnings,
            outcome,
        })
    }
}

impl Default for GenerationFlow {
    fn default() -> Self {
        Self::from_parts(BlueprintFlattener::new(), Validator::default())
    }
}
