use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::services::scoring::EvaluationScheme;

/// `same_page_number` 模式下，某张试卷始终无法排成参考页数时的处理方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamePagePolicy {
    /// 记录失败，继续生成剩余试卷
    #[default]
    SkipTest,
    /// 终止整批生成
    AbortBatch,
}

/// 程序配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 每张试卷允许的最大页数
    pub max_pages: u32,
    /// 每张试卷最多尝试排版的次数
    pub max_attempts: u32,
    /// 判断正确选项的正则（匹配选项键的开头）
    pub correct_key_match: String,
    /// 是否要求所有试卷页数相同
    pub same_page_number: bool,
    pub same_page_policy: SamePagePolicy,
    /// 是否打乱每道题的选项顺序
    pub shuffle_answers: bool,
    /// 随机种子，不设置则每次随机
    pub seed: Option<u64>,
    /// 同时排版的试卷数量
    pub max_concurrent_tests: usize,
    /// 评分方案
    pub evaluation: EvaluationScheme,
    /// 自定义评分方案的注册名（`evaluation = "custom"` 时使用）
    pub evaluation_function: Option<String>,
    /// 答案文件路径
    pub solutions_file: String,
    /// 试卷开头文本框的标签（姓名、学号等）
    pub text_field_labels: Vec<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_pages: 2,
            max_attempts: 100,
            correct_key_match: "^a".to_string(),
            same_page_number: false,
            same_page_policy: SamePagePolicy::SkipTest,
            shuffle_answers: true,
            seed: None,
            max_concurrent_tests: 4,
            evaluation: EvaluationScheme::AllOrNothing,
            evaluation_function: None,
            solutions_file: "solutions.yaml".to_string(),
            text_field_labels: vec!["Name".to_string(), "ID".to_string()],
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量加载配置，未设置的变量使用默认值
    ///
    /// 变量已设置但无法解析时返回 `EnvVarParseFailed`，不会静默回退到默认值。
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let default = Self::default();
        let number = |name: &str| env_value(&lookup, name, "u32", |v| v.parse::<u32>().ok());
        let flag = |name: &str| env_value(&lookup, name, "bool", |v| v.parse::<bool>().ok());

        Ok(Self {
            max_pages: number("MAX_PAGES")?.unwrap_or(default.max_pages),
            max_attempts: number("MAX_ATTEMPTS")?.unwrap_or(default.max_attempts),
            correct_key_match: lookup("CORRECT_KEY_MATCH").unwrap_or(default.correct_key_match),
            same_page_number: flag("SAME_PAGE_NUMBER")?.unwrap_or(default.same_page_number),
            same_page_policy: env_value(&lookup, "SAME_PAGE_POLICY", "SamePagePolicy", parse_same_page_policy)?
                .unwrap_or(default.same_page_policy),
            shuffle_answers: flag("SHUFFLE_ANSWERS")?.unwrap_or(default.shuffle_answers),
            seed: env_value(&lookup, "SAMPLING_SEED", "u64", |v| v.parse::<u64>().ok())?.or(default.seed),
            max_concurrent_tests: env_value(&lookup, "MAX_CONCURRENT_TESTS", "usize", |v| v.parse::<usize>().ok())?
                .unwrap_or(default.max_concurrent_tests),
            evaluation: env_value(&lookup, "EVALUATION", "EvaluationScheme", |v| v.parse::<EvaluationScheme>().ok())?
                .unwrap_or(default.evaluation),
            evaluation_function: lookup("EVALUATION_FUNCTION").or(default.evaluation_function),
            solutions_file: lookup("SOLUTIONS_FILE").unwrap_or(default.solutions_file),
            text_field_labels: default.text_field_labels,
            verbose_logging: flag("VERBOSE_LOGGING")?.unwrap_or(default.verbose_logging),
        })
    }

    /// 从 TOML 文本解析，缺省字段使用默认值
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("无法解析配置")?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    pub async fn from_toml_file(path: &Path) -> AppResult<Self> {
        let display = path.display().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::file_read_failed(&display, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|source| FileError::TomlParseFailed { path: display, source })?;
        config.validate()?;

        Ok(config)
    }

    /// 检查配置取值
    pub fn validate(&self) -> AppResult<()> {
        if self.max_attempts == 0 {
            return Err(not_positive("max_attempts"));
        }
        if self.max_pages == 0 {
            return Err(not_positive("max_pages"));
        }
        if self.max_concurrent_tests == 0 {
            return Err(not_positive("max_concurrent_tests"));
        }
        regex::Regex::new(&self.correct_key_match)
            .map_err(|e| AppError::invalid_pattern(&self.correct_key_match, e))?;
        Ok(())
    }
}

fn not_positive(name: &str) -> AppError {
    AppError::Config(ConfigError::NotPositive {
        name: name.to_string(),
    })
}

/// 读取一个环境变量：未设置为 `None`，已设置但无法解析为错误
fn env_value<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    expected_type: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> AppResult<Option<T>> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => match parse(value.trim()) {
            Some(parsed) => Ok(Some(parsed)),
            None => Err(AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            })),
        },
    }
}

fn parse_same_page_policy(value: &str) -> Option<SamePagePolicy> {
    match value {
        "skip-test" | "skip_test" => Some(SamePagePolicy::SkipTest),
        "abort-batch" | "abort_batch" => Some(SamePagePolicy::AbortBatch),
        _ => None,
    }
}
