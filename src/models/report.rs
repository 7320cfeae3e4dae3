use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::test_paper::TestId;
use crate::error::EvaluationError;

/// 单题阅卷结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemOutcome {
    pub problem_index: u32,
    /// 题目来源（题号未知时为空）
    pub pool_index: Option<usize>,
    pub problem_key: Option<String>,
    pub checked: BTreeSet<u32>,
    pub correct: BTreeSet<u32>,
    /// 出错的题目没有得分，也不计入总分
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 一张试卷的阅卷报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub test_id: TestId,
    pub text_fields: BTreeMap<String, String>,
    pub outcomes: Vec<ProblemOutcome>,
    /// 所有成功评分题目的得分之和
    pub total: f64,
    /// 是否所有题目都成功评分
    pub complete: bool,
    #[serde(skip)]
    pub errors: Vec<EvaluationError>,
}

impl EvaluationReport {
    pub fn outcome(&self, problem_index: u32) -> Option<&ProblemOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.problem_index == problem_index)
    }

    /// 出错的题号
    pub fn failed_problems(&self) -> Vec<u32> {
        self.outcomes
            .iter()
            .filter(|o| o.score.is_none())
            .map(|o| o.problem_index)
            .collect()
    }
}

/// 一批作答的阅卷汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub reports: Vec<EvaluationReport>,
}

impl EvaluationSummary {
    pub fn report(&self, test_id: TestId) -> Option<&EvaluationReport> {
        self.reports.iter().find(|r| r.test_id == test_id)
    }

    /// 完整评分的试卷数
    pub fn complete_count(&self) -> usize {
        self.reports.iter().filter(|r| r.complete).count()
    }

    /// 全部单题错误
    pub fn errors(&self) -> impl Iterator<Item = &EvaluationError> + '_ {
        self.reports.iter().flat_map(|r| r.errors.iter())
    }

    /// 以 JSON 导出
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
