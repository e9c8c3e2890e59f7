pub mod blueprint_flattener;
pub mod reconstructor;
pub mod report_writer;
pub mod sampler;
pub mod synthesizer;
pub mod taxonomy_index;
pub mod validator;

pub use blueprint_flattener::{BlueprintFlattener, MAX_LEVELS};
pub use reconstructor::{DistributionReconstructor, ObservedDistribution};
pub use report_writer::ReportWriter;
pub use sampler::{GeneratedRow, GeneratedSet, Sampler};
pub use synthesizer::BankSynthesizer;
pub use taxonomy_index::TaxonomyIndex;
pub use validator::{
    CellRow, CellStatus, Finding, LeafRow, TypeRow, ValidationPolicy, ValidationReport, Validator,
};
