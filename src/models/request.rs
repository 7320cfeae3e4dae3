use serde::{Deserialize, Serialize};

/// 抽题请求
///
/// - `Counts`: 每个题库随机抽取的题目数
/// - `Fixed`: 每个题库明确指定的题目位置（从 0 开始，按给定顺序出题）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingRequest {
    Counts(Vec<usize>),
    Fixed(Vec<Vec<usize>>),
}

impl SamplingRequest {
    /// 请求覆盖的题库数量
    pub fn pool_count(&self) -> usize {
        match self {
            SamplingRequest::Counts(counts) => counts.len(),
            SamplingRequest::Fixed(indices) => indices.len(),
        }
    }

    /// 每张试卷的题目总数
    pub fn problem_count(&self) -> usize {
        match self {
            SamplingRequest::Counts(counts) => counts.iter().sum(),
            SamplingRequest::Fixed(indices) => indices.iter().map(Vec::len).sum(),
        }
    }

    /// 固定选题模式下不会重抽
    pub fn is_fixed(&self) -> bool {
        matches!(self, SamplingRequest::Fixed(_))
    }
}

impl std::fmt::Display for SamplingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingRequest::Counts(counts) => write!(f, "随机抽题 {:?}", counts),
            SamplingRequest::Fixed(indices) => write!(f, "指定题目 {:?}", indices),
        }
    }
}
