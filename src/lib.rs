//! # Choice Exam
//!
//! 随机选择题试卷生成与阅卷
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 外部阻塞调用的边界，只暴露能力
//! - `LayoutOracle` - 给出候选试卷的排版页数
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PoolIndex` - 题库校验与索引
//! - `Sampler` - 抽题与组卷
//! - `SolutionRecorder` - 记录正确选项位置
//! - `SolutionStore` - 读写答案文件
//! - `scoring` - 评分方案与注册表
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张试卷"、"一份作答"的完整流程
//! - `TestCtx` - 上下文封装（试卷编号 + 种子 + 参考页数）
//! - `TestFlow` - 抽题 → 排版 → 重试 → 记录答案
//! - `EvaluationFlow` - 核对 → 评分 → 汇总
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_generator` - 批量生成，管理并发和失败
//! - `orchestrator/evaluator` - 批量阅卷
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, SamePagePolicy};
pub use error::{AppError, AppResult};
pub use infrastructure::{FnLayoutOracle, LayoutOracle};
pub use models::{PoolSource, RawProblem, SamplingRequest, SolutionSet, Submission, Test, TestId};
pub use orchestrator::{BatchGenerator, BatchOutcome, Evaluator};
pub use services::{EvaluationScheme, PolicyRegistry, PoolIndex, ScoringPolicy, SolutionStore};
pub use workflow::{EvaluationFlow, TestCtx, TestFlow};
