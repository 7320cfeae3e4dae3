//! 阅卷流程 - 流程层
//!
//! 核心职责：定义"一份作答"的完整阅卷流程
//!
//! 流程顺序：
//! 1. 按试卷编号找到标准答案
//! 2. 逐题核对（未知题号、答案不一致）
//! 3. 评分并汇总，出错的题目不计入总分

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::EvaluationError;
use crate::models::{EvaluationReport, ProblemOutcome, SolutionRecord, SolutionSet, Submission, SubmittedAnswer};
use crate::services::{score, ScoringPolicy};

/// 阅卷流程
pub struct EvaluationFlow {
    policy: Arc<dyn ScoringPolicy>,
    text_field_labels: Vec<String>,
}

impl EvaluationFlow {
    pub fn new(policy: Arc<dyn ScoringPolicy>, text_field_labels: Vec<String>) -> Self {
        Self {
            policy,
            text_field_labels,
        }
    }

    pub fn policy(&self) -> &dyn ScoringPolicy {
        self.policy.as_ref()
    }

    /// 批改一份作答
    ///
    /// 单题出错只影响该题，其余题目照常评分，报告标记为不完整。
    pub fn run(&self, solutions: &SolutionSet, submission: &Submission) -> EvaluationReport {
        let test_id = submission.test_id;
        let records = solutions.test(test_id);
        if records.is_none() {
            warn!("[试卷 {}] ⚠️ 答案文件中没有这张试卷", test_id);
        }

        // 记录过的题号 ∪ 提交的题号
        let problem_indices: BTreeSet<u32> = records
            .into_iter()
            .flat_map(|r| r.keys().copied())
            .chain(submission.answers.keys().copied())
            .collect();

        let mut outcomes = Vec::with_capacity(problem_indices.len());
        let mut errors = Vec::new();
        let mut total = 0.0;

        for problem_index in problem_indices {
            let answer = submission.answers.get(&problem_index);
            let record = records.and_then(|r| r.get(&problem_index));

            let outcome = match record {
                Some(record) => self.evaluate_problem(submission, problem_index, record, answer),
                None => Err(unknown_outcome(submission, problem_index, answer)),
            };

            match outcome {
                Ok(outcome) => {
                    total += outcome.score.unwrap_or_default();
                    outcomes.push(outcome);
                }
                Err((mut outcome, error)) => {
                    warn!("[试卷 {}] ⚠️ {}", test_id, error);
                    outcome.error = Some(error.to_string());
                    outcomes.push(outcome);
                    errors.push(error);
                }
            }
        }

        let complete = errors.is_empty() && records.is_some();
        debug!(
            "[试卷 {}] 得分 {} ({} 道题, {} 个错误)",
            test_id,
            total,
            outcomes.len(),
            errors.len()
        );

        EvaluationReport {
            test_id,
            text_fields: submission.labeled_text_fields(&self.text_field_labels),
            outcomes,
            total,
            complete,
            errors,
        }
    }

    fn evaluate_problem(
        &self,
        submission: &Submission,
        problem_index: u32,
        record: &SolutionRecord,
        answer: Option<&SubmittedAnswer>,
    ) -> Result<ProblemOutcome, (ProblemOutcome, EvaluationError)> {
        let test_id = submission.test_id;
        let checked = answer.map(|a| a.checked.clone()).unwrap_or_default();
        let mut outcome = ProblemOutcome {
            problem_index,
            pool_index: Some(record.pool_index),
            problem_key: Some(record.problem_key.clone()),
            checked,
            correct: record.correct.clone(),
            score: None,
            error: None,
        };

        if let Some(submitted) = answer.and_then(|a| a.correct.as_ref()) {
            if submitted != &record.correct {
                let error = EvaluationError::SolutionMismatch {
                    test_id,
                    problem_index,
                    recorded: record.correct.iter().copied().collect(),
                    submitted: submitted.iter().copied().collect(),
                };
                return Err((outcome, error));
            }
        }

        match score(
            self.policy.as_ref(),
            &record.correct,
            &outcome.checked,
            record.answer_count,
            record.points,
        ) {
            Ok(value) => {
                outcome.score = Some(value);
                Ok(outcome)
            }
            Err(source) => Err((
                outcome,
                EvaluationError::Scoring {
                    test_id,
                    problem_index,
                    source,
                },
            )),
        }
    }
}

fn unknown_outcome(
    submission: &Submission,
    problem_index: u32,
    answer: Option<&SubmittedAnswer>,
) -> (ProblemOutcome, EvaluationError) {
    let outcome = ProblemOutcome {
        problem_index,
        pool_index: None,
        problem_key: None,
        checked: answer.map(|a| a.checked.clone()).unwrap_or_default(),
        correct: BTreeSet::new(),
        score: None,
        error: None,
    };
    let error = EvaluationError::UnknownProblemIndex {
        test_id: submission.test_id,
        problem_index,
    };
    (outcome, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestId;
    use crate::services::scoring::{AllOrNothing, CustomPolicy, ProportionalNegative};
    use std::collections::BTreeMap;

    fn record(correct: &[u32], points: f64) -> SolutionRecord {
        SolutionRecord {
            pool_index: 0,
            problem_key: "k".to_string(),
            points,
            correct: correct.iter().copied().collect(),
            answer_count: 4,
        }
    }

    fn solutions() -> SolutionSet {
        let mut set = SolutionSet::new();
        let mut records = BTreeMap::new();
        records.insert(1, record(&[1, 2], 10.0));
        records.insert(2, record(&[3], 4.0));
        records.insert(3, record(&[4], 2.0));
        set.insert_test(TestId(1), records);
        set
    }

    fn labels() -> Vec<String> {
        vec!["Name".to_string()]
    }

    #[test]
    fn test_scores_and_missing_answers() {
        let flow = EvaluationFlow::new(Arc::new(ProportionalNegative), labels());
        let submission = Submission::new(TestId(1))
            .with_answer(1, SubmittedAnswer::checked([1]))
            .with_answer(2, SubmittedAnswer::checked([3]));

        let report = flow.run(&solutions(), &submission);
        assert!(report.complete);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.outcome(1).unwrap().score, Some(5.0));
        assert_eq!(report.outcome(2).unwrap().score, Some(4.0));
        // 未作答的题目按空集评分
        assert_eq!(report.outcome(3).unwrap().score, Some(0.0));
        assert_eq!(report.total, 9.0);
    }

    #[test]
    fn test_mismatch_is_flagged_and_rest_continues() {
        let flow = EvaluationFlow::new(Arc::new(AllOrNothing), labels());
        let submission = Submission::new(TestId(1))
            .with_answer(1, SubmittedAnswer::checked([1, 2]).with_correct([1, 2]))
            .with_answer(2, SubmittedAnswer::checked([3]).with_correct([2]))
            .with_answer(3, SubmittedAnswer::checked([4]));

        let report = flow.run(&solutions(), &submission);
        assert!(!report.complete);
        assert_eq!(report.failed_problems(), vec![2]);
        assert_eq!(report.total, 12.0);
        assert_eq!(
            report.errors,
            vec![EvaluationError::SolutionMismatch {
                test_id: TestId(1),
                problem_index: 2,
                recorded: vec![3],
                submitted: vec![2],
            }]
        );
    }

    #[test]
    fn test_unknown_problem_and_unknown_test() {
        let flow = EvaluationFlow::new(Arc::new(AllOrNothing), labels());

        let submission = Submission::new(TestId(1)).with_answer(9, SubmittedAnswer::checked([1]));
        let report = flow.run(&solutions(), &submission);
        assert!(!report.complete);
        assert_eq!(report.errors[0].problem_index(), Some(9));

        let stranger = Submission::new(TestId(42))
            .with_answer(1, SubmittedAnswer::checked([1]))
            .with_answer(2, SubmittedAnswer::checked([]));
        let report = flow.run(&solutions(), &stranger);
        assert!(!report.complete);
        assert_eq!(report.total, 0.0);
        assert_eq!(report.errors.len(), 2);
        assert!(report
            .errors
            .iter()
            .all(|e| matches!(e, EvaluationError::UnknownProblemIndex { test_id: TestId(42), .. })));
    }

    #[test]
    fn test_scoring_error_is_local_to_problem() {
        let picky = CustomPolicy::new("picky", |c, _, _, p| {
            if c.len() > 1 {
                anyhow::bail!("不支持多选题");
            }
            Ok(p)
        });
        let flow = EvaluationFlow::new(Arc::new(picky), labels());

        let report = flow.run(&solutions(), &Submission::new(TestId(1)));
        assert_eq!(report.failed_problems(), vec![1]);
        assert_eq!(report.total, 6.0);
        assert!(matches!(report.errors[0], EvaluationError::Scoring { problem_index: 1, .. }));
    }

    #[test]
    fn test_text_fields_are_labeled() {
        let flow = EvaluationFlow::new(Arc::new(AllOrNothing), labels());
        let mut submission = Submission::new(TestId(1));
        submission
            .text_fields
            .insert("t1:0".to_string(), "Kiss Anna".to_string());

        let report = flow.run(&solutions(), &submission);
        assert_eq!(report.text_fields.get("1. Name").map(String::as_str), Some("Kiss Anna"));
    }
}
