//! 组题批次上下文
//!
//! 封装"这是哪个题库的哪一次组题"这一信息，用于结果溯源。

use std::fmt::Display;

use chrono::Local;

/// 组题批次上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCtx {
    /// 批次号：本地时间戳 + 随机种子
    pub run_id: String,

    /// 题库名称
    pub bank_name: String,

    /// 本次组题使用的随机种子，相同种子与题库可复现相同结果
    pub seed: u64,
}

impl RunCtx {
    /// 创建新的批次上下文
    pub fn new(bank_name: impl Into<String>, seed: u64) -> Self {
        Self {
            run_id: format!("run_{}_{}", Local::now().format("%Y%m%d_%H%M%S"), seed),
            bank_name: bank_name.into(),
            seed,
        }
    }
}

impl Display for RunCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[批次 {} 题库 {} 种子 {}]",
            self.run_id, self.bank_name, self.seed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_carries_seed() {
        let ctx = RunCtx::new("样例题库", 1234);
        assert!(ctx.run_id.starts_with("run_"));
        assert!(ctx.run_id.ends_with("_1234"));
        assert!(ctx.to_string().contains("样例题库"));
    }
}
