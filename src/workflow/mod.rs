pub mod evaluation_flow;
pub mod test_ctx;
pub mod test_flow;

pub use evaluation_flow::EvaluationFlow;
pub use test_ctx::TestCtx;
pub use test_flow::{AcceptedTest, TestFlow};
