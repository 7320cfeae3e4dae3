//! 试卷生成流程 - 流程层
//!
//! 核心职责：定义"一张试卷"的完整生成流程
//!
//! 流程顺序：
//! 1. 抽题 → 组卷
//! 2. 排版 → 检查页数（不满足则回到 1，最多 `max_attempts` 次）
//! 3. 记录标准答案

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, SamplingError};
use crate::infrastructure::LayoutOracle;
use crate::models::{SamplingRequest, SolutionRecord, Test};
use crate::services::sampler::test_rng;
use crate::services::{Sampler, SolutionRecorder};
use crate::utils::logging::truncate_text;
use crate::workflow::test_ctx::TestCtx;

/// 被接受的试卷
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedTest {
    pub test: Test,
    /// 排版页数
    pub pages: u32,
    /// 调用排版器的次数
    pub attempts: u32,
    /// 题号 → 标准答案
    pub solutions: BTreeMap<u32, SolutionRecord>,
}

/// 试卷生成流程
///
/// - 编排抽题、排版、重试、记录答案
/// - 不持有排版资源（由调用方传入）
/// - 只依赖业务能力（services）
pub struct TestFlow {
    sampler: Arc<Sampler>,
    recorder: SolutionRecorder,
    page_budget: u32,
    max_attempts: u32,
    verbose_logging: bool,
}

impl TestFlow {
    /// 创建新的试卷生成流程
    pub fn new(sampler: Arc<Sampler>, config: &Config) -> AppResult<Self> {
        if config.max_attempts == 0 {
            return Err(AppError::Config(ConfigError::NotPositive {
                name: "max_attempts".to_string(),
            }));
        }

        Ok(Self {
            sampler,
            recorder: SolutionRecorder::new(&config.correct_key_match)?,
            page_budget: config.max_pages,
            max_attempts: config.max_attempts,
            verbose_logging: config.verbose_logging,
        })
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// 生成一张满足页数限制的试卷
    ///
    /// 随机模式最多调用排版器 `max_attempts` 次；指定模式只尝试一次。
    pub fn run(
        &self,
        oracle: &dyn LayoutOracle,
        request: &SamplingRequest,
        ctx: &TestCtx,
    ) -> Result<AcceptedTest, SamplingError> {
        let allowed = if request.is_fixed() { 1 } else { self.max_attempts };
        let mut rng = test_rng(ctx.batch_seed, ctx.test_id);
        let mut last_page_count = None;

        for attempt in 1..=allowed {
            let test = self.sampler.draw_test(ctx.test_id, request, &mut rng)?;
            if self.verbose_logging {
                let first = test.items.first().map(|i| truncate_text(&i.problem.question, 30));
                debug!(
                    "{} 第 {} 次候选: {} 道题, 第一题 {:?}",
                    ctx,
                    attempt,
                    test.items.len(),
                    first
                );
            }

            let pages = oracle
                .page_count(&test)
                .and_then(|pages| {
                    anyhow::ensure!(pages > 0, "排版器返回 0 页");
                    Ok(pages)
                })
                .map_err(|e| SamplingError::OracleFailed {
                    test_id: ctx.test_id,
                    attempt,
                    reason: format!("{:#}", e),
                })?;
            last_page_count = Some(pages);

            if self.accepts(pages, ctx.reference_pages) {
                info!("{} ✓ 第 {} 次尝试排版成功: {} 页", ctx, attempt, pages);
                let solutions = self.recorder.record(&test);
                return Ok(AcceptedTest {
                    test,
                    pages,
                    attempts: attempt,
                    solutions,
                });
            }

            warn!(
                "{} ⚠️ 第 {}/{} 次尝试被拒绝: {} 页 (上限 {})",
                ctx, attempt, allowed, pages, self.page_budget
            );
        }

        Err(SamplingError::LayoutBudgetExceeded {
            test_id: ctx.test_id,
            attempts: allowed,
            page_budget: self.page_budget,
            last_page_count,
            reference_pages: ctx.reference_pages,
        })
    }

    fn accepts(&self, pages: u32, reference_pages: Option<u32>) -> bool {
        pages <= self.page_budget && reference_pages.map_or(true, |r| r == pages)
    }
}
