pub mod problem;
pub mod report;
pub mod request;
pub mod solution;
pub mod submission;
pub mod test_paper;

pub use problem::{AnswerOption, Pool, PoolSource, Problem, RawProblem};
pub use report::{EvaluationReport, EvaluationSummary, ProblemOutcome};
pub use request::SamplingRequest;
pub use solution::{SolutionRecord, SolutionSet};
pub use submission::{FormField, SubmittedAnswer, Submission};
pub use test_paper::{Test, TestId, TestItem};
