use crate::repositories::{RepositoryError, TodoRepository};
use async_trait::async_trait;
use domain::{Todo, TodoId};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// 簡易な InMemory 実装（開発/テスト用）
#[derive(Debug, Default)]
pub struct InMemoryTodoRepository {
    todos: RwLock<BTreeMap<TodoId, Todo>>,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> RepositoryError {
    RepositoryError::Store("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn list(&self) -> Result<Vec<Todo>, RepositoryError> {
        let todos = self.todos.read().map_err(poisoned)?;
        Ok(todos.values().cloned().collect())
    }

    async fn get(&self, id: &TodoId) -> Result<Option<Todo>, RepositoryError> {
        let todos = self.todos.read().map_err(poisoned)?;
        Ok(todos.get(id).cloned())
    }

    async fn insert(&self, todo: &Todo) -> Result<(), RepositoryError> {
        let mut todos = self.todos.write().map_err(poisoned)?;
        if todos.contains_key(&todo.id) {
            return Err(RepositoryError::Conflict(todo.id.clone()));
        }
        todos.insert(todo.id.clone(), todo.clone());
        Ok(())
    }

    async fn update(&self, todo: &Todo) -> Result<(), RepositoryError> {
        let mut todos = self.todos.write().map_err(poisoned)?;
        match todos.get_mut(&todo.id) {
            Some(current) => {
                *current = todo.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(todo.id.clone())),
        }
    }

    async fn delete(&self, id: &TodoId) -> Result<bool, RepositoryError> {
        let mut todos = self.todos.write().map_err(poisoned)?;
        Ok(todos.remove(id).is_some())
    }
}
