use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppResult, ConfigError, FileError};
use crate::models::{IdGrammar, DEFAULT_ID_PATTERN};
use crate::services::{ValidationPolicy, MAX_LEVELS};

/// 程序配置
///
/// 优先级：环境变量 > 配置文件 > 默认值
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 题库名称（写入组题结果）
    pub bank_name: String,
    /// 随机种子，未设置时每次运行随机生成
    pub seed: Option<u64>,
    /// 复核报告目录
    pub report_dir: String,
    /// 组题结果目录
    pub output_dir: String,
    /// 严格总量：实际总数必须等于要求总数
    pub strict_totals: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 题目ID格式正则
    pub id_pattern: String,
    /// 知识点树最大层级
    pub max_levels: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bank_name: "样例题库".to_string(),
            seed: None,
            report_dir: "reports".to_string(),
            output_dir: "output".to_string(),
            strict_totals: false,
            verbose_logging: false,
            id_pattern: DEFAULT_ID_PATTERN.to_string(),
            max_levels: MAX_LEVELS,
        }
    }
}

impl Config {
    /// 读取 TOML 配置文件，缺省字段使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(FileError::NotFound { path: display }.into());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|source| FileError::ReadFailed {
                path: display.clone(),
                source,
            })?;
        let config = toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
            path: display,
            source,
        })?;
        Ok(config)
    }

    /// 加载配置：可选配置文件，再叠加环境变量
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        Ok(base.with_overrides(|name| std::env::var(name).ok())?)
    }

    /// 用 `lookup` 提供的变量覆盖当前配置
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("QBANK_BANK_NAME") {
            self.bank_name = v;
        }
        if let Some(v) = lookup("QBANK_SEED") {
            self.seed = Some(parse_var("QBANK_SEED", &v, "u64")?);
        }
        if let Some(v) = lookup("QBANK_REPORT_DIR") {
            self.report_dir = v;
        }
        if let Some(v) = lookup("QBANK_OUTPUT_DIR") {
            self.output_dir = v;
        }
        if let Some(v) = lookup("QBANK_STRICT_TOTALS") {
            self.strict_totals = parse_var("QBANK_STRICT_TOTALS", &v, "bool")?;
        }
        if let Some(v) = lookup("QBANK_VERBOSE") {
            self.verbose_logging = parse_var("QBANK_VERBOSE", &v, "bool")?;
        }
        if let Some(v) = lookup("QBANK_ID_PATTERN") {
            self.id_pattern = v;
        }
        if let Some(v) = lookup("QBANK_MAX_LEVELS") {
            self.max_levels = parse_var("QBANK_MAX_LEVELS", &v, "usize")?;
        }
        Ok(self)
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            strict_totals: self.strict_totals,
        }
    }

    pub fn id_grammar(&self) -> Result<IdGrammar, ConfigError> {
        IdGrammar::new(&self.id_pattern)
    }

    /// 配置的种子，未配置时随机生成一个（记录在组题批次中以便复现）
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    /// 导出为 TOML 文本
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn parse_var<T: std::str::FromStr>(
    var_name: &str,
    value: &str,
    expected_type: &str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        })
}
