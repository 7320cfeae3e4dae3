//! 题库索引 - 业务能力层
//!
//! 把解析好的数据源校验并整理成可按 (题库, 位置) 访问的题库列表

use std::collections::HashSet;
use tracing::info;

use crate::error::{AppResult, PoolError};
use crate::models::{Pool, PoolSource, Problem, RawProblem};
use crate::services::solution_recorder::CorrectKeyMatcher;

/// 题库索引
#[derive(Debug, Clone, Default)]
pub struct PoolIndex {
    pools: Vec<Pool>,
}

impl PoolIndex {
    /// 校验所有数据源并建立索引
    ///
    /// 任何一道题不合法都会让整个加载失败。
    pub fn load(sources: &[PoolSource], matcher: &CorrectKeyMatcher) -> AppResult<Self> {
        let mut pools = Vec::with_capacity(sources.len());

        for (pool_index, source) in sources.iter().enumerate() {
            let pool = load_pool(pool_index, source, matcher)?;
            info!(
                "✓ 题库 {} ({}) 加载 {} 道题目",
                pool_index,
                pool.name,
                pool.len()
            );
            pools.push(pool);
        }

        Ok(Self { pools })
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    /// 题库数量
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// 每个题库的题目数
    pub fn pool_sizes(&self) -> Vec<usize> {
        self.pools.iter().map(Pool::len).collect()
    }

    pub fn pool(&self, pool_index: usize) -> Option<&Pool> {
        self.pools.get(pool_index)
    }

    pub fn get(&self, pool_index: usize, position: usize) -> Option<&Problem> {
        self.pools.get(pool_index)?.get(position)
    }
}

fn load_pool(pool_index: usize, source: &PoolSource, matcher: &CorrectKeyMatcher) -> AppResult<Pool> {
    let mut seen = HashSet::new();
    let mut problems = Vec::with_capacity(source.entries.len());

    for (key, raw) in &source.entries {
        if !seen.insert(key.as_str()) {
            return Err(PoolError::DuplicateProblemKey {
                pool_index,
                source_name: source.name.clone(),
                problem_key: key.clone(),
            }
            .into());
        }
        problems.push(validate_problem(pool_index, key, raw, matcher)?);
    }

    Ok(Pool {
        index: pool_index,
        name: source.name.clone(),
        problems,
    })
}

fn validate_problem(
    pool_index: usize,
    key: &str,
    raw: &RawProblem,
    matcher: &CorrectKeyMatcher,
) -> Result<Problem, PoolError> {
    let problem_key = key.to_string();

    let points = raw.points.ok_or_else(|| PoolError::MissingPoints {
        pool_index,
        problem_key: problem_key.clone(),
    })?;
    if !points.is_finite() || points < 0.0 {
        return Err(PoolError::InvalidPoints {
            pool_index,
            problem_key,
            points,
        });
    }

    let question = raw.question.clone().ok_or_else(|| PoolError::MissingQuestion {
        pool_index,
        problem_key: problem_key.clone(),
    })?;

    if raw.answers.is_empty() {
        return Err(PoolError::NoAnswers {
            pool_index,
            problem_key,
        });
    }

    let mut answer_keys = HashSet::new();
    for answer in &raw.answers {
        if !answer_keys.insert(answer.key.as_str()) {
            return Err(PoolError::DuplicateAnswerKey {
                pool_index,
                problem_key,
                answer_key: answer.key.clone(),
            });
        }
    }

    // 没有正确选项的题目会让比例评分除以零，必须在加载时拒绝
    if !raw.answers.iter().any(|a| matcher.is_correct(&a.key)) {
        return Err(PoolError::NoCorrectAnswer {
            pool_index,
            problem_key,
            pattern: matcher.pattern().to_string(),
        });
    }

    Ok(Problem {
        key: problem_key,
        points,
        question,
        answers: raw.answers.clone(),
    })
}
