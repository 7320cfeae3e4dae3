//! 答案记录服务 - 业务能力层
//!
//! 只负责"判断哪些选项正确并记下位置"，不关心试卷如何生成

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{SolutionRecord, SolutionSet, Test, TestItem};

/// 正确选项匹配器
///
/// 选项键从开头匹配配置的正则即为正确选项。
#[derive(Debug, Clone)]
pub struct CorrectKeyMatcher {
    regex: Regex,
}

impl CorrectKeyMatcher {
    pub fn new(pattern: &str) -> AppResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| AppError::invalid_pattern(pattern, e))?;
        Ok(Self { regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// 最左匹配必须从偏移 0 开始
    pub fn is_correct(&self, answer_key: &str) -> bool {
        self.regex
            .find(answer_key)
            .map_or(false, |m| m.start() == 0)
    }
}

/// 答案记录器
pub struct SolutionRecorder {
    matcher: CorrectKeyMatcher,
}

impl SolutionRecorder {
    pub fn new(pattern: &str) -> AppResult<Self> {
        Ok(Self {
            matcher: CorrectKeyMatcher::new(pattern)?,
        })
    }

    pub fn with_matcher(matcher: CorrectKeyMatcher) -> Self {
        Self { matcher }
    }

    /// 记录一张试卷每道题的正确选项位置
    pub fn record(&self, test: &Test) -> BTreeMap<u32, SolutionRecord> {
        let records: BTreeMap<u32, SolutionRecord> = test
            .numbered_items()
            .map(|(problem_index, item)| (problem_index, self.record_item(item)))
            .collect();

        debug!("试卷 {} 记录了 {} 道题的答案", test.id, records.len());
        records
    }

    /// 记录并写入答案集合
    pub fn record_into(&self, solutions: &mut SolutionSet, test: &Test) {
        solutions.insert_test(test.id, self.record(test));
    }

    fn record_item(&self, item: &TestItem) -> SolutionRecord {
        let correct: BTreeSet<u32> = item
            .presented_answers()
            .enumerate()
            .filter(|(_, answer)| self.matcher.is_correct(&answer.key))
            .map(|(pos, _)| pos as u32 + 1)
            .collect();

        SolutionRecord {
            pool_index: item.pool_index,
            problem_key: item.problem.key.clone(),
            points: item.problem.points,
            correct,
            answer_count: item.answer_order.len() as u32,
        }
    }
}
