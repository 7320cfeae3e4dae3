//! 抽题服务 - 业务能力层
//!
//! 只负责"从题库中抽出一组题目"，不关心排版和重试。
//! 每次抽题都是 (题库, 请求, 随机数状态) 的纯函数，固定种子即可复现。

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::SamplingError;
use crate::models::{Problem, SamplingRequest, Test, TestId, TestItem};
use crate::services::pool_index::PoolIndex;

/// 抽题器
#[derive(Debug, Clone)]
pub struct Sampler {
    index: Arc<PoolIndex>,
    shuffle_answers: bool,
}

impl Sampler {
    pub fn new(index: Arc<PoolIndex>) -> Self {
        Self {
            index,
            shuffle_answers: true,
        }
    }

    /// 是否打乱选项顺序（构建器风格）
    pub fn with_shuffle_answers(mut self, shuffle_answers: bool) -> Self {
        self.shuffle_answers = shuffle_answers;
        self
    }

    pub fn index(&self) -> &PoolIndex {
        &self.index
    }

    /// 检查请求是否能满足
    ///
    /// 每批在生成任何试卷之前调用一次，失败则整批失败。
    /// 指定模式中的重复题目只记录警告。
    pub fn validate(&self, request: &SamplingRequest) -> Result<(), SamplingError> {
        self.check_bounds(request)?;
        if let SamplingRequest::Fixed(selection) = request {
            for (pool_index, indices) in selection.iter().enumerate() {
                if has_duplicates(indices) {
                    warn!("⚠️ 题库 {} 的指定题目中有重复: {:?}", pool_index, indices);
                }
            }
        }
        Ok(())
    }

    /// 只检查数量和下标，不记录日志（每次抽题都会调用）
    fn check_bounds(&self, request: &SamplingRequest) -> Result<(), SamplingError> {
        let pools = self.index.pools();
        if request.pool_count() != pools.len() {
            return Err(SamplingError::PoolCountMismatch {
                expected: pools.len(),
                actual: request.pool_count(),
            });
        }

        match request {
            SamplingRequest::Counts(counts) => {
                for (pool_index, (&requested, pool)) in counts.iter().zip(pools).enumerate() {
                    if requested > pool.len() {
                        return Err(SamplingError::InsufficientPoolSize {
                            pool_index,
                            requested,
                            available: pool.len(),
                        });
                    }
                }
            }
            SamplingRequest::Fixed(selection) => {
                for (pool_index, (indices, pool)) in selection.iter().zip(pools).enumerate() {
                    if let Some(&index) = indices.iter().find(|&&i| i >= pool.len()) {
                        return Err(SamplingError::InvalidIndex {
                            pool_index,
                            index,
                            pool_size: pool.len(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// 抽出一组题目
    ///
    /// - 随机模式: 每个题库无放回地均匀抽取，拼接后整体打乱，题目顺序不暴露题库
    /// - 指定模式: 按给定顺序，不打乱
    pub fn draw<R: Rng + ?Sized>(
        &self,
        request: &SamplingRequest,
        rng: &mut R,
    ) -> Result<Vec<TestItem>, SamplingError> {
        self.check_bounds(request)?;
        let pools = self.index.pools();
        let mut items = Vec::with_capacity(request.problem_count());

        match request {
            SamplingRequest::Counts(counts) => {
                for (pool_index, (&count, pool)) in counts.iter().zip(pools).enumerate() {
                    let positions = rand::seq::index::sample(rng, pool.len(), count).into_vec();
                    debug!("题库 {} 抽中位置 {:?}", pool_index, positions);
                    for position in positions {
                        items.push(self.present(pool_index, &pool.problems[position], rng));
                    }
                }
                items.shuffle(rng);
            }
            SamplingRequest::Fixed(selection) => {
                for (pool_index, (indices, pool)) in selection.iter().zip(pools).enumerate() {
                    for &position in indices {
                        items.push(self.present(pool_index, &pool.problems[position], rng));
                    }
                }
            }
        }

        Ok(items)
    }

    /// 组装试卷
    pub fn assemble(&self, test_id: TestId, items: Vec<TestItem>) -> Test {
        Test::new(test_id, items)
    }

    /// 抽题并组装
    pub fn draw_test<R: Rng + ?Sized>(
        &self,
        test_id: TestId,
        request: &SamplingRequest,
        rng: &mut R,
    ) -> Result<Test, SamplingError> {
        let items = self.draw(request, rng)?;
        Ok(self.assemble(test_id, items))
    }

    fn present<R: Rng + ?Sized>(&self, pool_index: usize, problem: &Problem, rng: &mut R) -> TestItem {
        let mut item = TestItem::in_declared_order(pool_index, problem.clone());
        if self.shuffle_answers {
            item.answer_order.shuffle(rng);
        }
        item
    }
}

fn has_duplicates(indices: &[usize]) -> bool {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).any(|w| w[0] == w[1])
}

/// 由批次种子和试卷编号派生每张试卷独立的种子 (splitmix64)
pub fn derive_test_seed(batch_seed: u64, test_id: TestId) -> u64 {
    let mut z = batch_seed.wrapping_add((test_id.0 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// 每张试卷独立的随机数生成器
pub fn test_rng(batch_seed: u64, test_id: TestId) -> StdRng {
    StdRng::seed_from_u64(derive_test_seed(batch_seed, test_id))
}
