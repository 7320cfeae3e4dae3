//! 评分服务 - 业务能力层
//!
//! 只负责"按评分方案给一道题打分"，不关心答案从哪里来
//!
//! 记号: C = 正确选项, A = 勾选的选项, R = 未勾选的选项, p = 分值

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, ScoringError};

/// 选项位置集合（从 1 开始）
pub type AnswerSet = BTreeSet<u32>;

/// 配置中的评分方案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationScheme {
    /// 全对才得分
    #[serde(alias = "regular")]
    AllOrNothing,
    /// 按比例计分，错选扣分，可以为负
    #[serde(alias = "negative")]
    ProportionalNegative,
    /// 同上，但最低 0 分
    #[serde(alias = "positive")]
    SemiNegative,
    /// 使用注册的自定义评分函数
    #[serde(alias = "my")]
    Custom,
}

impl FromStr for EvaluationScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_or_nothing" | "regular" => Ok(EvaluationScheme::AllOrNothing),
            "proportional_negative" | "negative" => Ok(EvaluationScheme::ProportionalNegative),
            "semi_negative" | "positive" => Ok(EvaluationScheme::SemiNegative),
            "custom" | "my" => Ok(EvaluationScheme::Custom),
            other => Err(ConfigError::UnknownPolicy {
                name: other.to_string(),
            }),
        }
    }
}

/// 评分方案
pub trait ScoringPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn compute(&self, correct: &AnswerSet, checked: &AnswerSet, rest: &AnswerSet, points: f64) -> Result<f64>;
}

/// 全对得满分，否则 0 分
#[derive(Debug, Clone, Copy, Default)]
pub struct AllOrNothing;

impl ScoringPolicy for AllOrNothing {
    fn name(&self) -> &str {
        "all_or_nothing"
    }

    fn compute(&self, correct: &AnswerSet, checked: &AnswerSet, _rest: &AnswerSet, points: f64) -> Result<f64> {
        Ok(if correct == checked { points } else { 0.0 })
    }
}

/// `((|C∩A| - |A-C|) / |C|) * p`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalNegative;

impl ScoringPolicy for ProportionalNegative {
    fn name(&self) -> &str {
        "proportional_negative"
    }

    fn compute(&self, correct: &AnswerSet, checked: &AnswerSet, _rest: &AnswerSet, points: f64) -> Result<f64> {
        Ok(signed_ratio(correct, checked) * points)
    }
}

/// `max(0, ((|C∩A| - |A-C|) / |C|) * p)`
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiNegative;

impl ScoringPolicy for SemiNegative {
    fn name(&self) -> &str {
        "semi_negative"
    }

    fn compute(&self, correct: &AnswerSet, checked: &AnswerSet, _rest: &AnswerSet, points: f64) -> Result<f64> {
        let raw = signed_ratio(correct, checked) * points;
        // NaN 原样返回，由 score() 报错
        Ok(if raw < 0.0 { 0.0 } else { raw })
    }
}

/// 空的 C 得到 NaN 或无穷大
fn signed_ratio(correct: &AnswerSet, checked: &AnswerSet) -> f64 {
    let hits = correct.intersection(checked).count() as f64;
    let misses = checked.difference(correct).count() as f64;
    (hits - misses) / correct.len() as f64
}

type ScoreFn = dyn Fn(&AnswerSet, &AnswerSet, &AnswerSet, f64) -> Result<f64> + Send + Sync;

/// 包装外部提供的评分函数 `(C, A, R, p) -> 分数`
#[derive(Clone)]
pub struct CustomPolicy {
    name: String,
    func: Arc<ScoreFn>,
}

impl CustomPolicy {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&AnswerSet, &AnswerSet, &AnswerSet, f64) -> Result<f64> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl std::fmt::Debug for CustomPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomPolicy").field("name", &self.name).finish()
    }
}

impl ScoringPolicy for CustomPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, correct: &AnswerSet, checked: &AnswerSet, rest: &AnswerSet, points: f64) -> Result<f64> {
        (self.func)(correct, checked, rest, points)
    }
}

/// 给一道题打分
///
/// # 参数
/// - `correct`: 正确选项位置
/// - `checked`: 勾选的选项位置（可以为空）
/// - `answer_count`: 选项总数，用于计算未勾选集合
/// - `points`: 分值
///
/// # 返回
/// 评分函数报错或结果不是有限数时返回 `InvalidScore`
pub fn score(
    policy: &dyn ScoringPolicy,
    correct: &AnswerSet,
    checked: &AnswerSet,
    answer_count: u32,
    points: f64,
) -> Result<f64, ScoringError> {
    let rest: AnswerSet = (1..=answer_count).filter(|p| !checked.contains(p)).collect();

    let value = policy
        .compute(correct, checked, &rest, points)
        .map_err(|e| ScoringError::InvalidScore {
            policy: policy.name().to_string(),
            reason: e.to_string(),
        })?;

    if !value.is_finite() {
        return Err(ScoringError::InvalidScore {
            policy: policy.name().to_string(),
            reason: format!("结果不是有限数: {}", value),
        });
    }

    Ok(value)
}

/// 评分方案注册表
///
/// 内置方案总是可用，自定义方案按名称注册。
#[derive(Default, Clone)]
pub struct PolicyRegistry {
    custom: HashMap<String, Arc<dyn ScoringPolicy>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册自定义方案，名称不能为空或重复
    pub fn register(&mut self, policy: CustomPolicy) -> AppResult<()> {
        let name = policy.name().trim().to_string();
        if name.is_empty() || self.custom.contains_key(&name) {
            return Err(AppError::Config(ConfigError::InvalidPolicyName { name }));
        }
        self.custom.insert(name, Arc::new(policy));
        Ok(())
    }

    /// 注册一个评分函数
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F) -> AppResult<()>
    where
        F: Fn(&AnswerSet, &AnswerSet, &AnswerSet, f64) -> Result<f64> + Send + Sync + 'static,
    {
        self.register(CustomPolicy::new(name, func))
    }

    /// 按配置选择评分方案
    pub fn resolve(&self, scheme: EvaluationScheme, function: Option<&str>) -> AppResult<Arc<dyn ScoringPolicy>> {
        let policy: Arc<dyn ScoringPolicy> = match scheme {
            EvaluationScheme::AllOrNothing => Arc::new(AllOrNothing),
            EvaluationScheme::ProportionalNegative => Arc::new(ProportionalNegative),
            EvaluationScheme::SemiNegative => Arc::new(SemiNegative),
            EvaluationScheme::Custom => {
                let name = function.unwrap_or_default().trim();
                self.custom
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownPolicy {
                        name: name.to_string(),
                    })?
            }
        };
        Ok(policy)
    }

    pub fn resolve_config(&self, config: &Config) -> AppResult<Arc<dyn ScoringPolicy>> {
        self.resolve(config.evaluation, config.evaluation_function.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(positions: &[u32]) -> AnswerSet {
        positions.iter().copied().collect()
    }

    #[test]
    fn test_all_or_nothing_boundaries() {
        assert_eq!(score(&AllOrNothing, &set(&[1, 2]), &set(&[]), 4, 10.0).unwrap(), 0.0);
        assert_eq!(score(&AllOrNothing, &set(&[1, 2]), &set(&[1, 2]), 4, 10.0).unwrap(), 10.0);
        assert_eq!(score(&AllOrNothing, &set(&[1, 2]), &set(&[1]), 4, 10.0).unwrap(), 0.0);
    }

    #[test]
    fn test_proportional_negative_boundaries() {
        assert_eq!(score(&ProportionalNegative, &set(&[1, 2]), &set(&[1]), 4, 10.0).unwrap(), 5.0);
        assert_eq!(score(&ProportionalNegative, &set(&[1, 2]), &set(&[1, 3]), 4, 10.0).unwrap(), 0.0);
        assert_eq!(score(&ProportionalNegative, &set(&[1, 2]), &set(&[3, 4]), 4, 10.0).unwrap(), -10.0);
        assert_eq!(score(&ProportionalNegative, &set(&[1, 2]), &set(&[]), 4, 10.0).unwrap(), 0.0);
    }

    #[test]
    fn test_semi_negative_floors_at_zero() {
        assert_eq!(score(&SemiNegative, &set(&[1, 2]), &set(&[3, 4]), 4, 10.0).unwrap(), 0.0);
        assert_eq!(score(&SemiNegative, &set(&[1, 2]), &set(&[1]), 4, 10.0).unwrap(), 5.0);
        assert_eq!(score(&SemiNegative, &set(&[1, 2]), &set(&[1, 2]), 4, 10.0).unwrap(), 10.0);
    }

    #[test]
    fn test_empty_correct_set_is_invalid_score() {
        let err = score(&ProportionalNegative, &set(&[]), &set(&[]), 3, 1.0).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidScore { ref policy, .. } if policy == "proportional_negative"));
    }

    #[test]
    fn test_custom_policy_sees_rest_set() {
        let policy = CustomPolicy::new("rest_count", |_c, _a, r, p| Ok(r.len() as f64 * p));
        assert_eq!(score(&policy, &set(&[1]), &set(&[2]), 4, 0.5).unwrap(), 1.5);
    }

    #[test]
    fn test_custom_policy_errors_and_nan_are_invalid() {
        let failing = CustomPolicy::new("boom", |_, _, _, _| anyhow::bail!("评分函数出错"));
        let nan = CustomPolicy::new("nan", |_, _, _, _| Ok(f64::NAN));

        assert!(score(&failing, &set(&[1]), &set(&[1]), 2, 1.0).is_err());
        assert!(score(&nan, &set(&[1]), &set(&[1]), 2, 1.0).is_err());
    }

    #[test]
    fn test_registry_resolves_builtins_and_custom() {
        let mut registry = PolicyRegistry::new();
        registry
            .register_fn("half", |c, a, _, p| Ok(if c == a { p / 2.0 } else { 0.0 }))
            .unwrap();

        assert_eq!(registry.resolve(EvaluationScheme::SemiNegative, None).unwrap().name(), "semi_negative");
        assert_eq!(registry.resolve(EvaluationScheme::Custom, Some("half")).unwrap().name(), "half");
        assert!(matches!(
            registry.resolve(EvaluationScheme::Custom, Some("missing")),
            Err(AppError::Config(ConfigError::UnknownPolicy { .. }))
        ));
        assert!(registry.register_fn("half", |_, _, _, p| Ok(p)).is_err());
        assert!(registry.register_fn("  ", |_, _, _, p| Ok(p)).is_err());
    }

    #[test]
    fn test_scheme_aliases() {
        assert_eq!("regular".parse::<EvaluationScheme>().unwrap(), EvaluationScheme::AllOrNothing);
        assert_eq!("positive".parse::<EvaluationScheme>().unwrap(), EvaluationScheme::SemiNegative);
        assert_eq!("my".parse::<EvaluationScheme>().unwrap(), EvaluationScheme::Custom);
        assert!("weird".parse::<EvaluationScheme>().is_err());
    }
}
