//! 批量试卷生成器 - 编排层
//!
//! ## 职责
//!
//! 生成一批试卷并收集标准答案，负责并发控制和失败处理。
//!
//! ## 核心功能
//!
//! 1. **请求校验**：任何试卷生成之前检查请求，失败则整批失败
//! 2. **并发控制**：使用 Semaphore 限制同时排版的试卷数
//! 3. **统一页数**：`same_page_number` 时先串行生成到第一张成功的试卷，再并发生成其余试卷
//! 4. **失败隔离**：单张试卷排版失败只记录，不影响其他试卷；
//!    需要终止整批时不再启动新试卷，正在运行的试卷在下一次排版前停止
//! 5. **可复现**：每张试卷的随机数由批次种子和试卷编号派生，与调度顺序无关

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{Config, SamePagePolicy};
use crate::error::{AppError, AppResult, SamplingError};
use crate::infrastructure::{CancellableOracle, LayoutOracle};
use crate::models::{SamplingRequest, SolutionSet, TestId};
use crate::services::{PoolIndex, Sampler, SolutionStore};
use crate::utils::logging::{log_phase_start, log_startup, print_final_stats};
use crate::workflow::{AcceptedTest, TestCtx, TestFlow};

/// 单张试卷的失败记录
#[derive(Debug, Clone, PartialEq)]
pub struct TestFailure {
    pub test_id: TestId,
    pub error: SamplingError,
}

/// 批量生成结果
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// 实际使用的批次种子
    pub seed: u64,
    /// `same_page_number` 模式下的统一页数
    pub reference_pages: Option<u32>,
    /// 成功的试卷，按编号排序
    pub tests: Vec<AcceptedTest>,
    /// 所有成功试卷的标准答案
    pub solutions: SolutionSet,
    pub failures: Vec<TestFailure>,
}

impl BatchOutcome {
    fn accept(&mut self, accepted: AcceptedTest) {
        self.solutions
            .insert_test(accepted.test.id, accepted.solutions.clone());
        self.tests.push(accepted);
    }

    pub fn success_count(&self) -> usize {
        self.tests.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn test(&self, test_id: TestId) -> Option<&AcceptedTest> {
        self.tests.iter().find(|t| t.test.id == test_id)
    }
}

/// 批量试卷生成器
///
/// 唯一持有排版器的模块。
pub struct BatchGenerator {
    config: Config,
    flow: Arc<TestFlow>,
    oracle: Arc<dyn LayoutOracle>,
}

impl BatchGenerator {
    pub fn new(config: Config, index: Arc<PoolIndex>, oracle: Arc<dyn LayoutOracle>) -> AppResult<Self> {
        config.validate()?;

        let sampler = Sampler::new(index).with_shuffle_answers(config.shuffle_answers);
        let flow = TestFlow::new(Arc::new(sampler), &config)?;

        Ok(Self {
            config,
            flow: Arc::new(flow),
            oracle,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 生成编号为 1..=count 的试卷
    pub async fn generate(&self, request: &SamplingRequest, count: u32) -> Result<BatchOutcome> {
        self.flow.sampler().validate(request).map_err(AppError::from)?;

        let seed = self.config.seed.unwrap_or_else(rand::random);
        log_startup(count, self.config.max_concurrent_tests, seed);
        info!("📋 {}", request);

        let request = Arc::new(request.clone());
        let oracle = Arc::new(CancellableOracle::new(self.oracle.clone()));
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_tests));
        let mut outcome = BatchOutcome {
            seed,
            ..Default::default()
        };

        let mut next = 1;
        if self.config.same_page_number && count > 0 {
            log_phase_start("确定统一页数", 1, count);
            while next <= count && outcome.reference_pages.is_none() {
                let ctx = TestCtx::new(TestId(next), seed);
                let permit = semaphore.clone().acquire_owned().await?;
                let handle = self.spawn_test(permit, oracle.clone(), request.clone(), ctx);
                let result = join_test(ctx.test_id, handle).await;
                if let Ok(accepted) = &result {
                    outcome.reference_pages = Some(accepted.pages);
                    info!("📄 统一页数确定为 {} 页 (试卷 {})", accepted.pages, next);
                }
                self.absorb(&mut outcome, ctx.test_id, result)?;
                next += 1;
            }
        }

        if next <= count {
            log_phase_start("并发生成", next, count);
            let mut handles = Vec::new();
            for id in next..=count {
                let ctx = TestCtx::new(TestId(id), seed).with_reference_pages(outcome.reference_pages);
                let permit = semaphore.clone().acquire_owned().await?;
                if oracle.is_cancelled() {
                    warn!("🛑 批次已终止，不再启动试卷 {} 及之后的试卷", id);
                    break;
                }
                handles.push((ctx.test_id, self.spawn_test(permit, oracle.clone(), request.clone(), ctx)));
            }

            let results = futures::future::join_all(
                handles
                    .into_iter()
                    .map(|(test_id, handle)| async move { (test_id, join_test(test_id, handle).await) }),
            )
            .await;

            for (test_id, result) in results {
                self.absorb(&mut outcome, test_id, result)?;
            }
        }

        print_final_stats(
            outcome.success_count(),
            outcome.failed_count(),
            count as usize,
            outcome.reference_pages,
        );
        Ok(outcome)
    }

    /// 生成并把标准答案写入配置的答案文件
    pub async fn generate_and_store(&self, request: &SamplingRequest, count: u32) -> Result<BatchOutcome> {
        let outcome = self.generate(request, count).await?;
        let store = SolutionStore::new(&self.config.solutions_file);
        store
            .save(&outcome.solutions)
            .await
            .with_context(|| format!("无法保存答案文件: {}", self.config.solutions_file))?;
        Ok(outcome)
    }

    fn spawn_test(
        &self,
        permit: OwnedSemaphorePermit,
        oracle: Arc<CancellableOracle<Arc<dyn LayoutOracle>>>,
        request: Arc<SamplingRequest>,
        ctx: TestCtx,
    ) -> JoinHandle<Result<AcceptedTest, SamplingError>> {
        let flow = self.flow.clone();
        let policy = self.config.same_page_policy;

        // 排版器是阻塞调用
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = flow.run(oracle.as_ref(), &request, &ctx);
            // 在释放许可之前取消，等待许可的循环一定能看到
            if let Err(error) = &result {
                if aborts_batch(error, policy) {
                    oracle.cancel();
                }
            }
            result
        })
    }

    /// 收集一张试卷的结果，需要终止整批时返回错误
    fn absorb(
        &self,
        outcome: &mut BatchOutcome,
        test_id: TestId,
        result: Result<AcceptedTest, SamplingError>,
    ) -> Result<()> {
        let error = match result {
            Ok(accepted) => {
                outcome.accept(accepted);
                return Ok(());
            }
            Err(error) => error,
        };

        if aborts_batch(&error, self.config.same_page_policy) {
            error!("[试卷 {}] ❌ 终止整批生成: {}", test_id, error);
            return Err(AppError::from(error).into());
        }

        warn!("[试卷 {}] ⚠️ 生成失败，跳过: {}", test_id, error);
        outcome.failures.push(TestFailure { test_id, error });
        Ok(())
    }
}

/// 这个错误是否需要终止整批生成
fn aborts_batch(error: &SamplingError, policy: SamePagePolicy) -> bool {
    let reference_mismatch = matches!(
        error,
        SamplingError::LayoutBudgetExceeded {
            reference_pages: Some(_),
            ..
        }
    );
    !AppError::from(error.clone()).is_local_to_test()
        || (reference_mismatch && policy == SamePagePolicy::AbortBatch)
}

async fn join_test(
    test_id: TestId,
    handle: JoinHandle<Result<AcceptedTest, SamplingError>>,
) -> Result<AcceptedTest, SamplingError> {
    match handle.await {
        Ok(result) => result,
        Err(e) => {
            error!("[试卷 {}] 任务执行失败: {}", test_id, e);
            Err(SamplingError::OracleFailed {
                test_id,
                attempt: 0,
                reason: e.to_string(),
            })
        }
    }
}
