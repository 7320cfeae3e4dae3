use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::test_paper::TestId;
use crate::error::{AppError, AppResult, FileError};

/// 一道题的标准答案快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PersistedRecord", into = "PersistedRecord")]
pub struct SolutionRecord {
    pub pool_index: usize,
    pub problem_key: String,
    pub points: f64,
    /// 正确选项的位置（从 1 开始，按呈现顺序）
    pub correct: BTreeSet<u32>,
    /// 选项总数
    pub answer_count: u32,
}

/// 持久化格式: `{ source: [题库(从1开始), 题目键, 分值], correct: [...], options: n }`
#[derive(Serialize, Deserialize)]
struct PersistedRecord {
    source: (usize, String, f64),
    correct: BTreeSet<u32>,
    options: u32,
}

impl TryFrom<PersistedRecord> for SolutionRecord {
    type Error = String;

    fn try_from(r: PersistedRecord) -> Result<Self, Self::Error> {
        let (pool, problem_key, points) = r.source;
        let pool_index = pool
            .checked_sub(1)
            .ok_or_else(|| format!("题目 {} 的题库序号为 0，题库序号从 1 开始", problem_key))?;
        Ok(Self {
            pool_index,
            problem_key,
            points,
            correct: r.correct,
            answer_count: r.options,
        })
    }
}

impl From<SolutionRecord> for PersistedRecord {
    fn from(r: SolutionRecord) -> Self {
        Self {
            source: (r.pool_index + 1, r.problem_key, r.points),
            correct: r.correct,
            options: r.answer_count,
        }
    }
}

/// 所有试卷的标准答案: 试卷 → 题号 → 记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolutionSet {
    tests: BTreeMap<TestId, BTreeMap<u32, SolutionRecord>>,
}

impl SolutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一张试卷的全部记录（同一试卷再次写入会覆盖旧记录）
    pub fn insert_test(&mut self, test_id: TestId, records: BTreeMap<u32, SolutionRecord>) {
        self.tests.insert(test_id, records);
    }

    pub fn test(&self, test_id: TestId) -> Option<&BTreeMap<u32, SolutionRecord>> {
        self.tests.get(&test_id)
    }

    pub fn get(&self, test_id: TestId, problem_index: u32) -> Option<&SolutionRecord> {
        self.tests.get(&test_id)?.get(&problem_index)
    }

    pub fn contains_test(&self, test_id: TestId) -> bool {
        self.tests.contains_key(&test_id)
    }

    pub fn test_ids(&self) -> impl Iterator<Item = TestId> + '_ {
        self.tests.keys().copied()
    }

    /// 试卷数量
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// 合并另一组答案，试卷编号冲突时报错
    pub fn merge(&mut self, other: SolutionSet) -> AppResult<()> {
        for (test_id, records) in other.tests {
            if self.tests.contains_key(&test_id) {
                return Err(FileError::DuplicateTest { test_id }.into());
            }
            self.tests.insert(test_id, records);
        }
        Ok(())
    }

    /// 序列化为 YAML 文本
    pub fn to_yaml(&self) -> AppResult<String> {
        serde_yaml::to_string(self).map_err(|source| yaml_error(String::new(), source))
    }

    /// 从 YAML 文本解析
    ///
    /// 支持多文档（每个文档一张或多张试卷），文档之间的试卷编号不能重复。
    pub fn from_yaml(text: &str) -> AppResult<Self> {
        let mut set = SolutionSet::new();
        if text.trim().is_empty() {
            return Ok(set);
        }

        for document in serde_yaml::Deserializer::from_str(text) {
            let part = SolutionSet::deserialize(document)
                .map_err(|source| yaml_error(String::new(), source))?;
            set.merge(part)?;
        }

        Ok(set)
    }
}

pub(crate) fn yaml_error(path: String, source: serde_yaml::Error) -> AppError {
    AppError::File(FileError::YamlFailed { path, source })
}
