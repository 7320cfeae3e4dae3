pub mod pool_index;
pub mod sampler;
pub mod scoring;
pub mod solution_recorder;
pub mod solution_store;

pub use pool_index::PoolIndex;
pub use sampler::{derive_test_seed, test_rng, Sampler};
pub use scoring::{score, AnswerSet, CustomPolicy, EvaluationScheme, PolicyRegistry, ScoringPolicy};
pub use solution_recorder::{CorrectKeyMatcher, SolutionRecorder};
pub use solution_store::SolutionStore;
