use async_trait::async_trait;
use domain::{Todo, TodoId};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("Todo not found: {0}")]
    NotFound(TodoId),

    #[error("Todo already exists: {0}")]
    Conflict(TodoId),

    /// 一時的な障害（スロットリング・サービス停止など）
    #[error("Store temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }
}

/// Todo の永続化ポート
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// 全件を識別子（＝作成順）で並べて返す
    async fn list(&self) -> Result<Vec<Todo>, RepositoryError>;

    async fn get(&self, id: &TodoId) -> Result<Option<Todo>, RepositoryError>;

    /// 同じ識別子が既に存在する場合は Conflict
    async fn insert(&self, todo: &Todo) -> Result<(), RepositoryError>;

    /// 存在しない場合は NotFound
    async fn update(&self, todo: &Todo) -> Result<(), RepositoryError>;

    /// 削除できた場合 true
    async fn delete(&self, id: &TodoId) -> Result<bool, RepositoryError>;
}
