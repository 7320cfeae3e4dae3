use thiserror::Error;

use crate::models::TestId;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 题库（池）数据错误
    #[error("题库错误: {0}")]
    Pool(#[from] PoolError),
    /// 抽题错误
    #[error("抽题错误: {0}")]
    Sampling(#[from] SamplingError),
    /// 评分错误
    #[error("评分错误: {0}")]
    Scoring(#[from] ScoringError),
    /// 阅卷错误
    #[error("阅卷错误: {0}")]
    Evaluation(#[from] EvaluationError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 题库数据错误（题目缺字段、重复键等）
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoolError {
    /// 缺少分值
    #[error("题库 {pool_index} 的题目 {problem_key} 缺少分值")]
    MissingPoints { pool_index: usize, problem_key: String },
    /// 分值为负数或不是有限数
    #[error("题库 {pool_index} 的题目 {problem_key} 分值无效: {points}")]
    InvalidPoints {
        pool_index: usize,
        problem_key: String,
        points: f64,
    },
    /// 缺少题干
    #[error("题库 {pool_index} 的题目 {problem_key} 缺少题干")]
    MissingQuestion { pool_index: usize, problem_key: String },
    /// 没有任何选项
    #[error("题库 {pool_index} 的题目 {problem_key} 没有选项")]
    NoAnswers { pool_index: usize, problem_key: String },
    /// 选项键重复
    #[error("题库 {pool_index} 的题目 {problem_key} 选项键重复: {answer_key}")]
    DuplicateAnswerKey {
        pool_index: usize,
        problem_key: String,
        answer_key: String,
    },
    /// 没有选项匹配正确答案模式
    #[error("题库 {pool_index} 的题目 {problem_key} 没有匹配 '{pattern}' 的正确选项")]
    NoCorrectAnswer {
        pool_index: usize,
        problem_key: String,
        pattern: String,
    },
    /// 同一数据源中题目键重复
    #[error("题库 {pool_index} ({source_name}) 中题目键重复: {problem_key}")]
    DuplicateProblemKey {
        pool_index: usize,
        source_name: String,
        problem_key: String,
    },
}

/// 抽题错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    /// 请求向量长度与题库数量不一致
    #[error("题库数量 ({expected}) 与请求长度 ({actual}) 不一致")]
    PoolCountMismatch { expected: usize, actual: usize },
    /// 请求题目数超过题库容量
    #[error("题库 {pool_index} 题目不足: 请求 {requested}, 共 {available}")]
    InsufficientPoolSize {
        pool_index: usize,
        requested: usize,
        available: usize,
    },
    /// 指定题目索引越界
    #[error("题库 {pool_index} 的索引 {index} 超出范围 [0, {pool_size})")]
    InvalidIndex {
        pool_index: usize,
        index: usize,
        pool_size: usize,
    },
    /// 尝试次数用尽仍无法满足页数限制
    #[error(
        "试卷 {test_id} 无法排入 {page_budget} 页 (尝试 {attempts} 次, 最后一次 {last_page_count:?} 页, 参考页数 {reference_pages:?})"
    )]
    LayoutBudgetExceeded {
        test_id: TestId,
        attempts: u32,
        page_budget: u32,
        last_page_count: Option<u32>,
        reference_pages: Option<u32>,
    },
    /// 排版器调用失败
    #[error("试卷 {test_id} 排版失败 (第 {attempt} 次): {reason}")]
    OracleFailed {
        test_id: TestId,
        attempt: u32,
        reason: String,
    },
}

/// 评分错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// 评分函数报错或返回非有限数
    #[error("评分方案 {policy} 得分无效: {reason}")]
    InvalidScore { policy: String, reason: String },
}

/// 阅卷错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// 提交中引用了从未生成的试卷/题号
    #[error("试卷 {test_id} 不存在题目 {problem_index}")]
    UnknownProblemIndex { test_id: TestId, problem_index: u32 },
    /// 提交中附带的正确答案与记录的答案不一致
    #[error("试卷 {test_id} 题目 {problem_index} 的答案不一致: 记录 {recorded:?}, 提交 {submitted:?}")]
    SolutionMismatch {
        test_id: TestId,
        problem_index: u32,
        recorded: Vec<u32>,
        submitted: Vec<u32>,
    },
    /// 单题评分失败
    #[error("试卷 {test_id} 题目 {problem_index} 评分失败: {source}")]
    Scoring {
        test_id: TestId,
        problem_index: u32,
        source: ScoringError,
    },
    /// 表单字段无法解析
    #[error("表单字段 {field} 无法解析: {reason}")]
    MalformedField { field: String, reason: String },
}

impl EvaluationError {
    /// 出错的题号（表单字段错误没有题号）
    pub fn problem_index(&self) -> Option<u32> {
        match self {
            EvaluationError::UnknownProblemIndex { problem_index, .. }
            | EvaluationError::SolutionMismatch { problem_index, .. }
            | EvaluationError::Scoring { problem_index, .. } => Some(*problem_index),
            EvaluationError::MalformedField { .. } => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        source: toml::de::Error,
    },
    /// YAML 解析/序列化失败
    #[error("YAML处理失败 ({path}): {source}")]
    YamlFailed {
        path: String,
        source: serde_yaml::Error,
    },
    /// 答案文件中同一试卷出现多次
    #[error("答案文件中试卷 {test_id} 重复")]
    DuplicateTest { test_id: TestId },
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 正则表达式无效
    #[error("正确答案模式 '{pattern}' 无效: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    /// 数值必须为正
    #[error("配置项 {name} 必须大于 0")]
    NotPositive { name: String },
    /// 未注册的自定义评分方案
    #[error("未知的自定义评分方案: {name}")]
    UnknownPolicy { name: String },
    /// 自定义评分方案重名或名称为空
    #[error("自定义评分方案名称无效: '{name}'")]
    InvalidPolicyName { name: String },
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Evaluation(EvaluationError::MalformedField {
            field: String::new(), // JSON 错误不对应具体字段
            reason: err.to_string(),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建正则模式错误
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        AppError::Config(ConfigError::InvalidPattern {
            pattern: pattern.into(),
            reason: source.to_string(),
        })
    }

    /// 是否是单张试卷范围内的错误（批量生成可以继续）
    pub fn is_local_to_test(&self) -> bool {
        matches!(
            self,
            AppError::Sampling(SamplingError::LayoutBudgetExceeded { .. })
                | AppError::Sampling(SamplingError::OracleFailed { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
