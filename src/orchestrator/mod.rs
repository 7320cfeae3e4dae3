//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_generator` - 批量试卷生成器
//! - 校验抽题请求
//! - 控制并发数量（Semaphore + spawn_blocking）
//! - 持有排版器
//! - `same_page_number` 两阶段生成
//! - 收集标准答案和失败记录
//!
//! ### `evaluator` - 阅卷汇总器
//! - 选择评分方案
//! - 逐份调用 EvaluationFlow
//! - 输出阅卷统计
//!
//! ## 层次关系
//!
//! ```text
//! batch_generator (处理 N 张试卷)      evaluator (处理 Vec<Submission>)
//!     ↓                                   ↓
//! workflow::TestFlow (单张试卷)       workflow::EvaluationFlow (单份作答)
//!     ↓                                   ↓
//! services (能力层：抽题 / 记录答案 / 评分 / 答案文件)
//!     ↓
//! infrastructure (基础设施：LayoutOracle)
//! ```

pub mod batch_generator;
pub mod evaluator;

// 重新导出主要类型
pub use batch_generator::{BatchGenerator, BatchOutcome, TestFailure};
pub use evaluator::Evaluator;
