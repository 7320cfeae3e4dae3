//! 答案文件服务 - 业务能力层
//!
//! 只负责"读写答案文件"能力，不关心试卷如何生成

use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, FileError};
use crate::models::solution::yaml_error;
use crate::models::SolutionSet;

/// 答案文件服务
pub struct SolutionStore {
    path: PathBuf,
}

impl SolutionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 覆盖写入整个答案集合
    pub async fn save(&self, solutions: &SolutionSet) -> AppResult<()> {
        let yaml = solutions.to_yaml()?;
        fs::write(&self.path, yaml)
            .await
            .map_err(|e| AppError::file_write_failed(self.display(), e))?;

        info!("💾 已保存 {} 张试卷的答案: {}", solutions.len(), self.display());
        Ok(())
    }

    /// 以新的 YAML 文档追加到文件末尾
    ///
    /// 逐张生成试卷时使用，文件会变成多文档流。
    pub async fn append(&self, solutions: &SolutionSet) -> AppResult<()> {
        let document = format!("---\n{}", solutions.to_yaml()?);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::file_write_failed(self.display(), e))?;
        file.write_all(document.as_bytes())
            .await
            .map_err(|e| AppError::file_write_failed(self.display(), e))?;
        file.flush()
            .await
            .map_err(|e| AppError::file_write_failed(self.display(), e))?;

        debug!("追加 {} 张试卷的答案到 {}", solutions.len(), self.display());
        Ok(())
    }

    /// 读取答案文件（单文档或多文档）
    pub async fn load(&self) -> AppResult<SolutionSet> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::file_read_failed(self.display(), e))?;

        let solutions = SolutionSet::from_yaml(&content).map_err(|e| self.with_path(e))?;
        info!("📂 已读取 {} 张试卷的答案: {}", solutions.len(), self.display());
        Ok(solutions)
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    /// 解析错误补上文件路径
    fn with_path(&self, err: AppError) -> AppError {
        match err {
            AppError::File(FileError::YamlFailed { source, .. }) => yaml_error(self.display(), source),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SolutionRecord, TestId};
    use std::collections::{BTreeMap, BTreeSet};

    fn set_with(test_id: u32) -> SolutionSet {
        let mut set = SolutionSet::new();
        let mut records = BTreeMap::new();
        records.insert(
            1,
            SolutionRecord {
                pool_index: 0,
                problem_key: "q1".to_string(),
                points: 2.0,
                correct: BTreeSet::from([1, 3]),
                answer_count: 4,
            },
        );
        set.insert_test(TestId(test_id), records);
        set
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SolutionStore::new(dir.path().join("solutions.yaml"));

        let mut solutions = set_with(1);
        solutions.merge(set_with(2)).unwrap();
        store.save(&solutions).await.unwrap();

        let loaded = tokio_test::assert_ok!(store.load().await);
        assert_eq!(loaded, solutions);
    }

    #[tokio::test]
    async fn test_append_builds_multi_document_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SolutionStore::new(dir.path().join("solutions.yaml"));

        store.append(&set_with(1)).await.unwrap();
        store.append(&set_with(2)).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.test_ids().collect::<Vec<_>>(), vec![TestId(1), TestId(2)]);

        store.append(&set_with(2)).await.unwrap();
        assert!(matches!(
            store.load().await,
            Err(AppError::File(FileError::DuplicateTest { test_id: TestId(2) }))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SolutionStore::new(dir.path().join("missing.yaml"));

        assert!(matches!(
            store.load().await,
            Err(AppError::File(FileError::ReadFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_garbage_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "1: [not, a, record").unwrap();

        match SolutionStore::new(&path).load().await {
            Err(AppError::File(FileError::YamlFailed { path: p, .. })) => {
                assert!(p.ends_with("broken.yaml"))
            }
            other => panic!("expected yaml error, got {:?}", other),
        }
    }
}
