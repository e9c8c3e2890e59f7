pub mod generation_flow;
pub mod run_ctx;

pub use generation_flow::{GenerationFlow, GenerationOutcome, GenerationRun};
pub use run_ctx::RunCtx;
