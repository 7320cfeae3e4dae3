//! 排版器 - 基础设施层
//!
//! 唯一对外的阻塞调用：把一张候选试卷交给外部排版工具并拿回页数。
//! 本 crate 只定义边界和适配器，真正的排版由调用方提供。

use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::models::Test;

/// 排版器
///
/// 职责：
/// - 给出候选试卷排版后的页数
/// - 不认识题库、评分
/// - 不决定是否重试
pub trait LayoutOracle: Send + Sync {
    fn page_count(&self, test: &Test) -> Result<u32>;
}

impl<T: LayoutOracle + ?Sized> LayoutOracle for std::sync::Arc<T> {
    fn page_count(&self, test: &Test) -> Result<u32> {
        (**self).page_count(test)
    }
}

/// 用闭包实现的排版器
pub struct FnLayoutOracle<F> {
    func: F,
}

impl<F> FnLayoutOracle<F>
where
    F: Fn(&Test) -> Result<u32> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> LayoutOracle for FnLayoutOracle<F>
where
    F: Fn(&Test) -> Result<u32> + Send + Sync,
{
    fn page_count(&self, test: &Test) -> Result<u32> {
        (self.func)(test)
    }
}

/// 统计调用次数的包装（用于日志和测试）
pub struct CountingOracle<O> {
    inner: O,
    calls: AtomicU32,
}

impl<O: LayoutOracle> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            calls: AtomicU32::new(0),
        }
    }

    /// 累计调用次数
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<O: LayoutOracle> LayoutOracle for CountingOracle<O> {
    fn page_count(&self, test: &Test) -> Result<u32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.page_count(test)
    }
}

/// 可以整批取消的包装
///
/// 取消后不再调用内部排版器，直接返回错误，正在重试的试卷在下一次排版时停止。
pub struct CancellableOracle<O> {
    inner: O,
    cancelled: AtomicBool,
}

impl<O: LayoutOracle> CancellableOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl<O: LayoutOracle> LayoutOracle for CancellableOracle<O> {
    fn page_count(&self, test: &Test) -> Result<u32> {
        if self.is_cancelled() {
            anyhow::bail!("批次已终止，不再排版试卷 {}", test.id);
        }
        self.inner.page_count(test)
    }
}
