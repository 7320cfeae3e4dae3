use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::problem::{AnswerOption, Problem};

/// 试卷编号（批量生成时从 1 开始递增）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(pub u32);

impl Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TestId {
    fn from(id: u32) -> Self {
        TestId(id)
    }
}

/// 试卷中的一道题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    /// 题目所属题库（从 0 开始）
    pub pool_index: usize,
    pub problem: Problem,
    /// 选项的呈现顺序：`answer_order[i]` 是第 i+1 个位置上的选项在 `problem.answers` 中的下标
    pub answer_order: Vec<usize>,
}

impl TestItem {
    /// 按声明顺序呈现选项
    pub fn in_declared_order(pool_index: usize, problem: Problem) -> Self {
        let answer_order = (0..problem.answers.len()).collect();
        Self {
            pool_index,
            problem,
            answer_order,
        }
    }

    /// 按呈现顺序遍历选项
    pub fn presented_answers(&self) -> impl Iterator<Item = &AnswerOption> + '_ {
        self.answer_order
            .iter()
            .filter_map(move |&i| self.problem.answers.get(i))
    }

    pub fn answer_keys(&self) -> Vec<&str> {
        self.presented_answers().map(|a| a.key.as_str()).collect()
    }
}

/// 一张生成好的试卷，被接受后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: TestId,
    pub items: Vec<TestItem>,
}

impl Test {
    pub fn new(id: TestId, items: Vec<TestItem>) -> Self {
        Self { id, items }
    }

    /// 按题号（从 1 开始）获取题目
    pub fn problem(&self, problem_index: u32) -> Option<&TestItem> {
        let position = usize::try_from(problem_index).ok()?.checked_sub(1)?;
        self.items.get(position)
    }

    /// 以 (题号, 题目) 形式遍历
    pub fn numbered_items(&self) -> impl Iterator<Item = (u32, &TestItem)> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (i as u32 + 1, item))
    }

    /// 每个题库被抽中的题目数
    pub fn per_pool_counts(&self, pool_count: usize) -> Vec<usize> {
        let mut counts = vec![0; pool_count];
        for item in &self.items {
            if let Some(c) = counts.get_mut(item.pool_index) {
                *c += 1;
            }
        }
        counts
    }

    /// 试卷总分
    pub fn total_points(&self) -> f64 {
        self.items.iter().map(|i| i.problem.points).sum()
    }

    /// 所有复选框的表单字段名，顺序与排版一致
    pub fn answer_field_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (problem_index, item) in self.numbered_items() {
            for position in 1..=item.answer_order.len() as u32 {
                names.push(answer_field_name(
                    self.id,
                    problem_index,
                    item.pool_index,
                    &item.problem.key,
                    position,
                ));
            }
        }
        names
    }

    /// 姓名等文本字段的表单字段名
    pub fn text_field_names(&self, count: usize) -> Vec<String> {
        (0..count).map(|i| text_field_name(self.id, i)).collect()
    }
}

/// 复选框字段名: `试卷:题号:题库(从1开始):题目键:选项位置`
pub fn answer_field_name(
    test_id: TestId,
    problem_index: u32,
    pool_index: usize,
    problem_key: &str,
    position: u32,
) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        test_id,
        problem_index,
        pool_index + 1,
        problem_key,
        position
    )
}

/// 文本字段名: `t试卷:序号`
pub fn text_field_name(test_id: TestId, index: usize) -> String {
    format!("t{}:{}", test_id, index)
}
