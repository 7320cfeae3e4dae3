use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::test_paper::TestId;
use crate::error::{AppResult, EvaluationError};

/// 一道题的作答情况
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SubmittedAnswerRepr")]
pub struct SubmittedAnswer {
    /// 勾选的选项位置（从 1 开始）
    pub checked: BTreeSet<u32>,
    /// 表单中附带的正确答案，只用于和答案文件交叉校验
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<BTreeSet<u32>>,
}

impl SubmittedAnswer {
    pub fn checked(positions: impl IntoIterator<Item = u32>) -> Self {
        Self {
            checked: positions.into_iter().collect(),
            correct: None,
        }
    }

    /// 附带正确答案（构建器风格）
    pub fn with_correct(mut self, positions: impl IntoIterator<Item = u32>) -> Self {
        self.correct = Some(positions.into_iter().collect());
        self
    }
}

/// 兼容 `[勾选, 正确]` 二元组和完整结构两种写法
#[derive(Deserialize)]
#[serde(untagged)]
enum SubmittedAnswerRepr {
    Pair(BTreeSet<u32>, BTreeSet<u32>),
    Full {
        #[serde(default)]
        checked: BTreeSet<u32>,
        #[serde(default)]
        correct: Option<BTreeSet<u32>>,
    },
}

impl From<SubmittedAnswerRepr> for SubmittedAnswer {
    fn from(repr: SubmittedAnswerRepr) -> Self {
        match repr {
            SubmittedAnswerRepr::Pair(checked, correct) => Self {
                checked,
                correct: Some(correct),
            },
            SubmittedAnswerRepr::Full { checked, correct } => Self { checked, correct },
        }
    }
}

/// 一张已作答试卷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub test_id: TestId,
    /// 文本字段（姓名、学号等）: 字段名 → 值
    #[serde(default, alias = "_")]
    pub text_fields: BTreeMap<String, String>,
    /// 题号 → 作答
    #[serde(default, alias = "ans")]
    pub answers: BTreeMap<u32, SubmittedAnswer>,
}

/// 从表单中提取出的一个字段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// 字段值；有些阅读器不会为未勾选的复选框写值
    pub value: Option<String>,
}

impl FormField {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }

    pub fn empty() -> Self {
        Self { value: None }
    }

    /// 复选框是否被勾选（`/Yes`）
    pub fn is_checked(&self) -> bool {
        matches!(self.value.as_deref(), Some(v) if v.trim_start_matches('/') == "Yes")
    }
}

impl Submission {
    pub fn new(test_id: TestId) -> Self {
        Self {
            test_id,
            text_fields: BTreeMap::new(),
            answers: BTreeMap::new(),
        }
    }

    /// 设置一道题的作答（构建器风格）
    pub fn with_answer(mut self, problem_index: u32, answer: SubmittedAnswer) -> Self {
        self.answers.insert(problem_index, answer);
        self
    }

    /// 从 JSON 文本解析
    pub fn from_json_str(text: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 从表单字段构建作答，按试卷编号分组
    ///
    /// - 复选框: `试卷:题号:题库:题目键:选项位置`，值为 `/Yes` 表示勾选
    /// - 文本框: `t试卷:序号`
    ///
    /// 两种格式都不符合的字段（例如提交按钮）记录警告后跳过。
    pub fn from_form_fields(fields: &BTreeMap<String, FormField>) -> Vec<Submission> {
        let mut by_test: BTreeMap<TestId, Submission> = BTreeMap::new();

        for (name, field) in fields {
            if let Some(rest) = name.strip_prefix('t') {
                let test_id = match parse_text_field(name, rest) {
                    Ok((test_id, _)) => test_id,
                    Err(e) => {
                        warn!("⚠️ 跳过无法识别的表单字段: {}", e);
                        continue;
                    }
                };
                let value = field.value.clone().unwrap_or_default();
                by_test
                    .entry(test_id)
                    .or_insert_with(|| Submission::new(test_id))
                    .text_fields
                    .insert(name.clone(), value);
                continue;
            }

            let (test_id, problem_index, position) = match parse_answer_field(name) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("⚠️ 跳过无法识别的表单字段: {}", e);
                    continue;
                }
            };
            let answer = by_test
                .entry(test_id)
                .or_insert_with(|| Submission::new(test_id))
                .answers
                .entry(problem_index)
                .or_default();
            if field.is_checked() {
                answer.checked.insert(position);
            }
        }

        by_test.into_values().collect()
    }

    /// 把 `t试卷:序号` 形式的文本字段换成 `序号+1. 标签`
    pub fn labeled_text_fields(&self, labels: &[String]) -> BTreeMap<String, String> {
        self.text_fields
            .iter()
            .map(|(name, value)| {
                let label = name
                    .rsplit_once(':')
                    .and_then(|(_, idx)| idx.parse::<usize>().ok())
                    .and_then(|idx| labels.get(idx).map(|l| format!("{}. {}", idx + 1, l)))
                    .unwrap_or_else(|| name.clone());
                (label, value.clone())
            })
            .collect()
    }
}

fn malformed(field: &str, reason: &str) -> EvaluationError {
    EvaluationError::MalformedField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, part: &str, what: &str) -> Result<T, EvaluationError> {
    part.parse::<T>()
        .map_err(|_| malformed(field, &format!("{} '{}' 不是数字", what, part)))
}

fn parse_text_field(name: &str, rest: &str) -> Result<(TestId, usize), EvaluationError> {
    let (test, index) = rest
        .split_once(':')
        .ok_or_else(|| malformed(name, "文本字段缺少序号"))?;
    Ok((
        TestId(parse_number(name, test, "试卷编号")?),
        parse_number(name, index, "字段序号")?,
    ))
}

/// 题目键可能包含 `:`，所以选项位置从右侧取
fn parse_answer_field(name: &str) -> Result<(TestId, u32, u32), EvaluationError> {
    let (head, position) = name
        .rsplit_once(':')
        .ok_or_else(|| malformed(name, "不是复选框字段"))?;
    let parts: Vec<&str> = head.splitn(4, ':').collect();
    if parts.len() != 4 {
        return Err(malformed(name, "复选框字段应有 5 段"));
    }

    let test_id = TestId(parse_number(name, parts[0], "试卷编号")?);
    let problem_index = parse_number(name, parts[1], "题号")?;
    let _pool: usize = parse_number(name, parts[2], "题库序号")?;
    let position = parse_number(name, position, "选项位置")?;

    Ok((test_id, problem_index, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_form_fields_groups_checked_boxes() {
        let fields = BTreeMap::from([
            ("4:1:1:q:a:1".to_string(), FormField::new("/Yes")),
            ("4:1:1:q:a:2".to_string(), FormField::new("/Off")),
            ("4:2:2:k9:1".to_string(), FormField::empty()),
            ("4:2:2:k9:2".to_string(), FormField::new("/Yes")),
            ("4:3:1:k3:1".to_string(), FormField::new("/Off")),
            ("t4:0".to_string(), FormField::new("Kiss Anna")),
        ]);

        let submissions = Submission::from_form_fields(&fields);
        assert_eq!(submissions.len(), 1);

        let s = &submissions[0];
        assert_eq!(s.test_id, TestId(4));
        assert_eq!(s.answers[&1].checked, BTreeSet::from([1]));
        assert_eq!(s.answers[&2].checked, BTreeSet::from([2]));
        assert!(s.answers[&3].checked.is_empty());
        assert_eq!(s.text_fields["t4:0"], "Kiss Anna");
    }

    #[test]
    fn test_from_form_fields_skips_unrecognized_fields() {
        let fields = BTreeMap::from([
            ("Submit".to_string(), FormField::empty()),
            ("x:1:1:k:1".to_string(), FormField::new("/Yes")),
            ("tname".to_string(), FormField::new("?")),
            ("1:1:1:q:2".to_string(), FormField::new("/Yes")),
            ("2:1:1:q:2".to_string(), FormField::new("/Yes")),
        ]);

        let submissions = Submission::from_form_fields(&fields);
        let ids: Vec<TestId> = submissions.iter().map(|s| s.test_id).collect();
        assert_eq!(ids, vec![TestId(1), TestId(2)]);
        assert!(submissions
            .iter()
            .all(|s| s.answers[&1].checked == BTreeSet::from([2]) && s.text_fields.is_empty()));
    }

    #[test]
    fn test_answer_field_parse_errors() {
        assert!(matches!(
            parse_answer_field("Submit"),
            Err(EvaluationError::MalformedField { .. })
        ));
        assert!(parse_answer_field("1:1:1:2").is_err());
        assert_eq!(parse_answer_field("3:2:1:k:ey:4").unwrap(), (TestId(3), 2, 4));
    }

    #[test]
    fn test_json_accepts_pair_and_struct_answers() {
        let text = r#"{
            "test_id": 2,
            "_": {"t2:0": "Name"},
            "ans": {
                "1": [[1, 2], [1, 2]],
                "2": {"checked": [3]}
            }
        }"#;
        let s = Submission::from_json_str(text).unwrap();

        assert_eq!(s.answers[&1].correct, Some(BTreeSet::from([1, 2])));
        assert_eq!(s.answers[&2].checked, BTreeSet::from([3]));
        assert_eq!(s.answers[&2].correct, None);
        assert_eq!(
            s.labeled_text_fields(&["Név".to_string()]),
            BTreeMap::from([("1. Név".to_string(), "Name".to_string())])
        );
    }
}
