//! 阅卷汇总器 - 编排层
//!
//! 把一批作答和标准答案对齐，逐份交给 `EvaluationFlow`，汇总成 `EvaluationSummary`

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{EvaluationSummary, FormField, SolutionSet, Submission};
use crate::services::{PolicyRegistry, ScoringPolicy, SolutionStore};
use crate::utils::logging::print_evaluation_stats;
use crate::workflow::EvaluationFlow;

/// 阅卷汇总器
pub struct Evaluator {
    flow: EvaluationFlow,
}

impl Evaluator {
    pub fn new(policy: Arc<dyn ScoringPolicy>, text_field_labels: Vec<String>) -> Self {
        Self {
            flow: EvaluationFlow::new(policy, text_field_labels),
        }
    }

    /// 按配置选择评分方案
    pub fn from_config(config: &Config, registry: &PolicyRegistry) -> AppResult<Self> {
        let policy = registry.resolve_config(config)?;
        info!("🧮 评分方案: {}", policy.name());
        Ok(Self::new(policy, config.text_field_labels.clone()))
    }

    /// 批改一批作答，报告顺序与提交顺序一致
    pub fn evaluate(&self, solutions: &SolutionSet, submissions: &[Submission]) -> EvaluationSummary {
        let reports: Vec<_> = submissions
            .iter()
            .map(|submission| self.flow.run(solutions, submission))
            .collect();

        let summary = EvaluationSummary { reports };
        print_evaluation_stats(
            summary.complete_count(),
            summary.reports.len(),
            summary.errors().count(),
        );
        summary
    }

    /// 从表单字段解析作答后批改，无法识别的字段被跳过
    pub fn evaluate_form_fields(
        &self,
        solutions: &SolutionSet,
        fields: &BTreeMap<String, FormField>,
    ) -> EvaluationSummary {
        let submissions = Submission::from_form_fields(fields);
        self.evaluate(solutions, &submissions)
    }

    /// 读取答案文件后批改
    pub async fn evaluate_with_store(
        &self,
        store: &SolutionStore,
        submissions: &[Submission],
    ) -> AppResult<EvaluationSummary> {
        let solutions = store.load().await?;
        Ok(self.evaluate(&solutions, submissions))
    }
}
