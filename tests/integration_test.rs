use choice_exam::error::SamplingError;
use choice_exam::infrastructure::CountingOracle;
use choice_exam::models::{AnswerOption, FormField};
use choice_exam::services::CorrectKeyMatcher;
use choice_exam::{
    AppError, BatchGenerator, Config, EvaluationScheme, Evaluator, FnLayoutOracle, PolicyRegistry, PoolIndex,
    PoolSource, RawProblem, SamePagePolicy, SamplingRequest, SolutionStore, Test, TestId,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn pool(name: &str, size: usize) -> PoolSource {
    (0..size).fold(PoolSource::new(name), |source, i| {
        source.with_entry(
            format!("{}-{}", name, i),
            RawProblem {
                points: Some(1.0),
                question: Some(format!("{} 第 {} 题", name, i)),
                answers: vec![
                    AnswerOption::new("a", "正确"),
                    AnswerOption::new("b", "错误"),
                    AnswerOption::new("c", "错误"),
                ],
            },
        )
    })
}

fn index() -> Arc<PoolIndex> {
    let matcher = CorrectKeyMatcher::new("^a").unwrap();
    Arc::new(PoolIndex::load(&[pool("基础", 10), pool("提高", 5)], &matcher).unwrap())
}

fn config() -> Config {
    Config {
        max_pages: 2,
        max_attempts: 20,
        seed: Some(2024),
        ..Config::default()
    }
}

/// 按题目内容给出 1 或 2 页
fn content_pages(test: &Test) -> anyhow::Result<u32> {
    let checksum: usize = test
        .items
        .iter()
        .flat_map(|i| i.problem.key.bytes())
        .map(usize::from)
        .sum();
    Ok(1 + (checksum % 2) as u32)
}

#[tokio::test]
async fn test_generate_then_evaluate_perfect_answers() {
    let generator = BatchGenerator::new(config(), index(), Arc::new(FnLayoutOracle::new(|_: &Test| Ok(1)))).unwrap();

    let outcome = tokio_test::assert_ok!(generator.generate(&SamplingRequest::Counts(vec![3, 2]), 3).await);
    assert_eq!(outcome.success_count(), 3);
    assert_eq!(outcome.solutions.len(), 3);

    // 用生成时的字段名构造全对的表单
    let mut fields = BTreeMap::new();
    for accepted in &outcome.tests {
        assert_eq!(accepted.test.per_pool_counts(2), vec![3, 2]);
        for name in accepted.test.answer_field_names() {
            let parts: Vec<&str> = name.split(':').collect();
            let problem_index: u32 = parts[1].parse().unwrap();
            let position: u32 = parts[parts.len() - 1].parse().unwrap();
            let correct = &outcome.solutions.get(accepted.test.id, problem_index).unwrap().correct;
            let value = if correct.contains(&position) { "/Yes" } else { "/Off" };
            fields.insert(name, FormField::new(value));
        }
    }

    let evaluator = Evaluator::from_config(&config(), &PolicyRegistry::new()).unwrap();
    let summary = evaluator.evaluate_form_fields(&outcome.solutions, &fields);
    assert_eq!(summary.reports.len(), 3);
    assert!(summary.reports.iter().all(|r| r.complete && r.total == 5.0));
}

#[tokio::test]
async fn test_same_seed_reproduces_batch_regardless_of_concurrency() {
    let request = SamplingRequest::Counts(vec![4, 1]);
    let oracle = Arc::new(FnLayoutOracle::new(content_pages));

    let serial = BatchGenerator::new(
        Config {
            max_concurrent_tests: 1,
            ..config()
        },
        index(),
        oracle.clone(),
    )
    .unwrap();
    let parallel = BatchGenerator::new(
        Config {
            max_concurrent_tests: 4,
            ..config()
        },
        index(),
        oracle,
    )
    .unwrap();

    let a = serial.generate(&request, 6).await.unwrap();
    let b = parallel.generate(&request, 6).await.unwrap();
    assert_eq!(a.seed, b.seed);
    assert_eq!(a.tests, b.tests);
    assert_eq!(a.solutions, b.solutions);
    let ids: Vec<TestId> = b.tests.iter().map(|t| t.test.id).collect();
    assert_eq!(ids, (1..=6).map(TestId).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_same_page_number_gives_identical_page_counts() {
    let generator = BatchGenerator::new(
        Config {
            same_page_number: true,
            max_attempts: 100,
            ..config()
        },
        index(),
        Arc::new(FnLayoutOracle::new(content_pages)),
    )
    .unwrap();

    let outcome = generator.generate(&SamplingRequest::Counts(vec![2, 2]), 8).await.unwrap();
    let reference = outcome.reference_pages.unwrap();
    assert_eq!(outcome.success_count(), 8);
    assert!(outcome.tests.iter().all(|t| t.pages == reference));
}

#[tokio::test]
async fn test_first_failure_does_not_fix_reference() {
    // 第一张试卷总是 3 页，超出上限
    let oracle = FnLayoutOracle::new(|t: &Test| Ok(if t.id == TestId(1) { 3 } else { 2 }));
    let generator = BatchGenerator::new(
        Config {
            same_page_number: true,
            max_attempts: 2,
            ..config()
        },
        index(),
        Arc::new(oracle),
    )
    .unwrap();

    let outcome = generator.generate(&SamplingRequest::Counts(vec![1, 1]), 3).await.unwrap();
    assert_eq!(outcome.reference_pages, Some(2));
    assert_eq!(outcome.failed_count(), 1);
    assert_eq!(outcome.failures[0].test_id, TestId(1));
    assert_eq!(outcome.success_count(), 2);
}

#[tokio::test]
async fn test_reference_mismatch_skip_or_abort() {
    let by_id = |t: &Test| -> anyhow::Result<u32> { Ok(if t.id == TestId(1) { 1 } else { 2 }) };

    let skip = BatchGenerator::new(
        Config {
            same_page_number: true,
            max_attempts: 3,
            ..config()
        },
        index(),
        Arc::new(FnLayoutOracle::new(by_id)),
    )
    .unwrap();
    let outcome = skip.generate(&SamplingRequest::Counts(vec![1, 0]), 4).await.unwrap();
    assert_eq!(outcome.success_count(), 1);
    assert_eq!(outcome.failed_count(), 3);
    assert!(outcome.failures.iter().all(|f| matches!(
        f.error,
        SamplingError::LayoutBudgetExceeded {
            reference_pages: Some(1),
            attempts: 3,
            ..
        }
    )));

    let abort = BatchGenerator::new(
        Config {
            same_page_number: true,
            same_page_policy: SamePagePolicy::AbortBatch,
            max_attempts: 3,
            ..config()
        },
        index(),
        Arc::new(FnLayoutOracle::new(by_id)),
    )
    .unwrap();
    let err = tokio_test::assert_err!(abort.generate(&SamplingRequest::Counts(vec![1, 0]), 4).await);
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Sampling(SamplingError::LayoutBudgetExceeded { .. }))
    ));
}

#[tokio::test]
async fn test_abort_stops_remaining_tests() {
    let by_id = |t: &Test| -> anyhow::Result<u32> { Ok(if t.id == TestId(1) { 1 } else { 2 }) };
    let oracle = Arc::new(CountingOracle::new(FnLayoutOracle::new(by_id)));
    let generator = BatchGenerator::new(
        Config {
            same_page_number: true,
            same_page_policy: SamePagePolicy::AbortBatch,
            max_attempts: 3,
            max_concurrent_tests: 1,
            ..config()
        },
        index(),
        oracle.clone(),
    )
    .unwrap();

    let err = tokio_test::assert_err!(generator.generate(&SamplingRequest::Counts(vec![1, 0]), 10).await);
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Sampling(SamplingError::LayoutBudgetExceeded { test_id: TestId(2), .. }))
    ));
    // 试卷 1 一次，试卷 2 三次，之后的 8 张试卷不再排版
    assert_eq!(oracle.calls(), 4);
}

#[tokio::test]
async fn test_bad_request_fails_before_any_layout() {
    let oracle = Arc::new(CountingOracle::new(FnLayoutOracle::new(|_: &Test| Ok(1))));
    let generator = BatchGenerator::new(config(), index(), oracle.clone()).unwrap();

    let err = generator
        .generate(&SamplingRequest::Counts(vec![11, 1]), 2)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Sampling(SamplingError::InsufficientPoolSize {
            pool_index: 0,
            requested: 11,
            available: 10
        }))
    ));
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_fixed_mode_batch_and_solutions_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solutions.yaml");
    let config = Config {
        solutions_file: path.display().to_string(),
        shuffle_answers: false,
        evaluation: EvaluationScheme::SemiNegative,
        ..config()
    };
    let oracle = Arc::new(CountingOracle::new(FnLayoutOracle::new(|_: &Test| Ok(2))));
    let generator = BatchGenerator::new(config.clone(), index(), oracle.clone()).unwrap();

    let request = SamplingRequest::Fixed(vec![vec![3, 1], vec![4]]);
    let outcome = generator.generate_and_store(&request, 2).await.unwrap();
    assert_eq!(oracle.calls(), 2);
    assert_eq!(outcome.tests[0].test.items, outcome.tests[1].test.items);

    let keys: Vec<&str> = outcome.tests[0]
        .test
        .items
        .iter()
        .map(|i| i.problem.key.as_str())
        .collect();
    assert_eq!(keys, vec!["基础-3", "基础-1", "提高-4"]);

    let store = SolutionStore::new(&path);
    let submissions = vec![choice_exam::Submission::new(TestId(2))
        .with_answer(1, choice_exam::models::SubmittedAnswer::checked([1]))
        .with_answer(2, choice_exam::models::SubmittedAnswer::checked([2]))];
    let evaluator = Evaluator::from_config(&config, &PolicyRegistry::new()).unwrap();
    let summary = evaluator.evaluate_with_store(&store, &submissions).await.unwrap();

    // 选项未打乱，"a" 总在第 1 位
    let report = summary.report(TestId(2)).unwrap();
    assert_eq!(report.total, 1.0);
    assert!(report.complete);
}
