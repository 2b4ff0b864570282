use chrono::Utc;
use domain::{Todo, TodoChanges, TodoId};
use infrastructure::{
    DynamoDbClient, DynamoDbTodoRepository, InMemoryTodoRepository, RepositoryError, RetryConfig,
    TodoRepository,
};
use shared::Config;
use std::sync::Arc;

fn new_todo(title: &str) -> Todo {
    Todo::create(
        TodoChanges {
            title: Some(title.to_string()),
            ..Default::default()
        },
        Utc::now(),
    )
    .unwrap()
}

/// どの実装でも満たすべき振る舞い
async fn assert_repository_contract(repo: &dyn TodoRepository) {
    // 作成 → 取得
    let todo = new_todo("契約テスト");
    repo.insert(&todo).await.expect("insert");
    let fetched = repo.get(&todo.id).await.expect("get");
    assert_eq!(fetched.as_ref(), Some(&todo));

    // 同一IDの二重登録は Conflict
    match repo.insert(&todo).await {
        Err(RepositoryError::Conflict(id)) => assert_eq!(id, todo.id),
        other => panic!("Expected Conflict, got {other:?}"),
    }

    // 更新
    let mut updated = todo.clone();
    updated
        .apply(
            TodoChanges {
                completed: Some(true),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
    repo.update(&updated).await.expect("update");
    assert_eq!(repo.get(&todo.id).await.unwrap(), Some(updated.clone()));

    // 削除は一度だけ true
    assert!(repo.delete(&todo.id).await.unwrap());
    assert!(!repo.delete(&todo.id).await.unwrap());
    assert_eq!(repo.get(&todo.id).await.unwrap(), None);

    // 存在しない Todo の更新は NotFound
    match repo.update(&updated).await {
        Err(RepositoryError::NotFound(id)) => assert_eq!(id, todo.id),
        other => panic!("Expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_in_memory_repository_contract() {
    let repo = InMemoryTodoRepository::new();

    assert_repository_contract(&repo).await;
}

#[tokio::test]
async fn test_in_memory_list_is_ordered_by_creation() {
    let repo = InMemoryTodoRepository::new();
    let first = new_todo("1件目");
    // ULID はミリ秒単位なので時刻をずらす
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = new_todo("2件目");

    repo.insert(&second).await.unwrap();
    repo.insert(&first).await.unwrap();

    let titles: Vec<String> = repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["1件目", "2件目"]);
}

#[tokio::test]
async fn test_in_memory_concurrent_inserts() {
    let repo = Arc::new(InMemoryTodoRepository::new());

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.insert(&new_todo(&format!("並行 {i}"))).await })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    assert!(results.into_iter().all(|r| r.unwrap().is_ok()));
    assert_eq!(repo.list().await.unwrap().len(), 20);
}

#[tokio::test]
async fn test_get_unknown_id_returns_none() {
    let repo = InMemoryTodoRepository::new();

    assert_eq!(repo.get(&TodoId::new()).await.unwrap(), None);
}

/// DynamoDB Local（http://localhost:8000）と PK/SK テーブルが必要
#[tokio::test]
#[ignore]
async fn test_dynamodb_repository_contract() {
    let config = Config {
        dynamodb_table: std::env::var("DYNAMODB_TABLE").unwrap_or_else(|_| "test-table".into()),
        dynamodb_endpoint: Some("http://localhost:8000".to_string()),
        retry_max_attempts: 2,
        retry_initial_delay_ms: 10,
        ..Config::default()
    };
    let client = DynamoDbClient::new(&config).await;
    let repo = DynamoDbTodoRepository::new(client, RetryConfig::from(&config));

    assert_repository_contract(&repo).await;
}
