use serde::{Deserialize, Serialize};

/// 一个选项（键 + 文本）
///
/// 键决定选项是否正确（由配置的正则判断），文本对核心逻辑不透明。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub key: String,
    pub text: String,
}

impl AnswerOption {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

/// 校验后的题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub key: String,
    pub points: f64,
    pub question: String,
    pub answers: Vec<AnswerOption>,
}

impl Problem {
    /// 选项数量
    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }
}

/// 一个题库：来自同一数据源的有序题目集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// 题库序号（从 0 开始）
    pub index: usize,
    /// 数据源名称（通常是文件名）
    pub name: String,
    pub problems: Vec<Problem>,
}

impl Pool {
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Problem> {
        self.problems.get(position)
    }

    /// 所有题目的总分
    pub fn total_points(&self) -> f64 {
        self.problems.iter().map(|p| p.points).sum()
    }
}

/// 解析后但尚未校验的题目
///
/// 字段全部可选，由 `PoolIndex::load` 负责校验。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProblem {
    #[serde(default, alias = "P")]
    pub points: Option<f64>,
    #[serde(default, alias = "Q")]
    pub question: Option<String>,
    #[serde(default, alias = "A")]
    pub answers: Vec<AnswerOption>,
}

/// 一个数据源的解析结果
///
/// 使用有序的 (键, 题目) 列表而不是 map，重复键才能被发现。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolSource {
    pub name: String,
    pub entries: Vec<(String, RawProblem)>,
}

impl PoolSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// 追加一道题目（构建器风格）
    pub fn with_entry(mut self, key: impl Into<String>, problem: RawProblem) -> Self {
        self.entries.push((key.into(), problem));
        self
    }
}
