//! 试卷生成上下文
//!
//! 封装"我正在生成第几张试卷、用哪个种子、要对齐多少页"这一信息

use std::fmt::Display;

use crate::models::TestId;

/// 试卷生成上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCtx {
    /// 试卷编号
    pub test_id: TestId,

    /// 批次种子，与试卷编号一起派生本张试卷的随机数
    pub batch_seed: u64,

    /// 参考页数（`same_page_number` 模式下由第一张被接受的试卷确定）
    pub reference_pages: Option<u32>,
}

impl TestCtx {
    pub fn new(test_id: TestId, batch_seed: u64) -> Self {
        Self {
            test_id,
            batch_seed,
            reference_pages: None,
        }
    }

    /// 设置参考页数（构建器风格）
    pub fn with_reference_pages(mut self, reference_pages: Option<u32>) -> Self {
        self.reference_pages = reference_pages;
        self
    }
}

impl Display for TestCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reference_pages {
            Some(pages) => write!(f, "[试卷 #{} 参考页数 {}]", self.test_id, pages),
            None => write!(f, "[试卷 #{}]", self.test_id),
        }
    }
}
