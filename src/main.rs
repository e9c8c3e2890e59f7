//! qbank - 按蓝图组题与复核题库

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use question_bank_engine::models::{load_blueprint, load_pool};
use question_bank_engine::utils::logging::{init_tracing, log_startup};
use question_bank_engine::{
    BankSynthesizer, BatchValidator, BlueprintFlattener, Config, DistributionReconstructor,
    GenerationFlow, GenerationOutcome, ReportWriter, RunCtx, Validator,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "qbank")]
#[command(version)]
#[command(about = "按蓝图组题，并复核题库或试卷的题量分布")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件路径（TOML）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 随机种子（覆盖配置）
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// 严格总量
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 按蓝图生成样例题库
    Synth {
        /// 蓝图文件（JSON / TOML）
        #[arg(short, long)]
        blueprint: PathBuf,

        /// 输出题库文件（JSON）
        #[arg(short, long)]
        output: PathBuf,
    },

    /// 从题库中按蓝图组题
    Generate {
        #[arg(short, long)]
        blueprint: PathBuf,

        /// 题库文件（JSON / JSONL / TOML）
        #[arg(short, long)]
        pool: PathBuf,
    },

    /// 复核一份题库或试卷
    Validate {
        #[arg(short, long)]
        blueprint: PathBuf,

        /// 待复核的题目文件
        #[arg(short, long)]
        artifact: PathBuf,
    },

    /// 复核目录下的全部题目文件
    ValidateBatch {
        #[arg(short, long)]
        blueprint: PathBuf,

        #[arg(short, long)]
        folder: PathBuf,
    },

    /// 输出当前生效的配置（可作为配置文件模板）
    ExampleConfig,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("加载配置失败")?;
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.strict {
        config.strict_totals = true;
    }
    if cli.verbose {
        config.verbose_logging = true;
    }
    Ok(config)
}

fn report_writer(config: &Config) -> ReportWriter {
    ReportWriter::new(&config.report_dir, &config.output_dir)
}

fn validator(config: &Config) -> Result<Validator> {
    Ok(Validator::new(
        config.id_grammar()?,
        config.validation_policy(),
    ))
}

async fn synth(config: &Config, blueprint: &Path, output: &Path) -> Result<ExitCode> {
    let blueprint = load_blueprint(blueprint).await?;
    let seed = config.resolve_seed();
    info!("随机种子: {}", seed);

    let records = BankSynthesizer::new().synthesize(&blueprint, &mut StdRng::seed_from_u64(seed))?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("无法创建目录: {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(&json!({ "questions": &records }))?;
    tokio::fs::write(output, text)
        .await
        .with_context(|| format!("写入题库失败: {}", output.display()))?;

    info!("✓ 共生成 {} 道题目: {}", records.len(), output.display());
    Ok(ExitCode::SUCCESS)
}

async fn generate(config: &Config, blueprint: &Path, pool: &Path) -> Result<ExitCode> {
    let blueprint = load_blueprint(blueprint).await?;
    let pool = load_pool(pool).await?;
    let ctx = RunCtx::new(&config.bank_name, config.resolve_seed());
    let writer = report_writer(config);

    let run = match GenerationFlow::new(config)?.run(&blueprint, &pool, &ctx) {
        Ok(run) => run,
        Err(e) => {
            if let Some(shortages) = e.shortages() {
                for s in shortages {
                    error!("❌ {}", s);
                }
            }
            return Err(e.into());
        }
    };

    writer.write_report(&ctx.run_id, run.outcome.report()).await?;
    match &run.outcome {
        GenerationOutcome::Committed { set, .. } => {
            writer.write_generated(&ctx, set).await?;
            Ok(ExitCode::SUCCESS)
        }
        GenerationOutcome::Discarded { report } => {
            warn!("⚠️ {} 未提交: {}", ctx, report.summary());
            Ok(ExitCode::from(2))
        }
    }
}

async fn validate(config: &Config, blueprint: &Path, artifact: &Path) -> Result<ExitCode> {
    let blueprint = load_blueprint(blueprint).await?;
    let records = load_pool(artifact).await?;
    let requirements = BlueprintFlattener::with_max_depth(config.max_levels).flatten(&blueprint)?;

    let observed = DistributionReconstructor::new().reconstruct(&records);
    let report = validator(config)?.validate(&requirements, &observed);

    let prefix = artifact
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "validation".to_string());
    report_writer(config).write_report(&prefix, &report).await?;

    Ok(if report.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

async fn validate_batch(config: &Config, blueprint: &Path, folder: &Path) -> Result<ExitCode> {
    let blueprint = load_blueprint(blueprint).await?;
    let requirements = BlueprintFlattener::with_max_depth(config.max_levels).flatten(&blueprint)?;
    let writer = report_writer(config);

    let summary = BatchValidator::new(validator(config)?)
        .validate_folder(&requirements, folder, Some(&writer))
        .await?;

    Ok(if summary.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(config.verbose_logging);

    match &cli.command {
        Commands::ExampleConfig => {
            println!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Synth { blueprint, output } => {
            log_startup("生成样例题库");
            synth(&config, blueprint, output).await
        }
        Commands::Generate { blueprint, pool } => {
            log_startup("组题");
            generate(&config, blueprint, pool).await
        }
        Commands::Validate {
            blueprint,
            artifact,
        } => {
            log_startup("复核");
            validate(&config, blueprint, artifact).await
        }
        Commands::ValidateBatch { blueprint, folder } => {
            log_startup("批量复核");
            validate_batch(&config, blueprint, folder).await
        }
    }
}
