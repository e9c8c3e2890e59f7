pub mod blueprint;
pub mod knowledge;
pub mod loaders;
pub mod question;
pub mod question_id;

pub use blueprint::{Blueprint, BlueprintNode, SamplingRequirement};
pub use knowledge::{join_code, normalize_code};
pub use loaders::{load_blueprint, load_pool, load_pools_in_folder};
pub use question::{QuestionRecord, QuestionType};
pub use question_id::{IdGrammar, IdIssue, DEFAULT_ID_PATTERN};
