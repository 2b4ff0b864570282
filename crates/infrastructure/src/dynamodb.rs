use crate::models::{item_to_todo, todo_to_item, DynamoDbKeys, TODO_PARTITION, TODO_SORT_PREFIX};
use crate::repositories::{RepositoryError, TodoRepository};
use crate::retry::{retry_store_operation, RetryConfig};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::{Client, Error as DynamoError};
use domain::{Todo, TodoId};
use shared::Config;
use std::collections::HashMap;
use tracing::{error, info};

#[derive(Clone)]
pub struct DynamoDbClient {
    client: Client,
    table_name: String,
}

impl DynamoDbClient {
    /// DYNAMODB_ENDPOINT が設定されていれば DynamoDB Local などに接続する
    pub async fn new(config: &Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(endpoint) = &config.dynamodb_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        Self {
            client: Client::new(&aws_config),
            table_name: config.dynamodb_table.clone(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

/// シングルテーブル上の Todo リポジトリ
pub struct DynamoDbTodoRepository {
    db: DynamoDbClient,
    retry: RetryConfig,
}

impl DynamoDbTodoRepository {
    pub fn new(db: DynamoDbClient, retry: RetryConfig) -> Self {
        Self { db, retry }
    }
}

/// DynamoDBエラーがリトライ可能かどうかを判定
fn is_transient(detail: &str) -> bool {
    let retryable_errors = [
        "ThrottlingException",
        "ProvisionedThroughputExceededException",
        "ServiceUnavailable",
        "InternalServerError",
        "RequestLimitExceeded",
        "DispatchFailure",
        "TimeoutError",
    ];

    retryable_errors.iter().any(|&err| detail.contains(err))
}

fn classify(err: DynamoError) -> RepositoryError {
    let detail = format!("{err:?}");
    match err {
        DynamoError::ProvisionedThroughputExceededException(_)
        | DynamoError::RequestLimitExceeded(_)
        | DynamoError::InternalServerError(_) => RepositoryError::Unavailable(detail),
        _ if is_transient(&detail) => RepositoryError::Unavailable(detail),
        _ => {
            error!(error = %detail, "DynamoDB error");
            RepositoryError::Store(detail)
        }
    }
}

#[async_trait]
impl TodoRepository for DynamoDbTodoRepository {
    async fn list(&self) -> Result<Vec<Todo>, RepositoryError> {
        let mut todos = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let output = retry_store_operation(
                || {
                    let request = self
                        .db
                        .client()
                        .query()
                        .table_name(self.db.table_name())
                        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                        .expression_attribute_values(
                            ":pk",
                            AttributeValue::S(TODO_PARTITION.to_string()),
                        )
                        .expression_attribute_values(
                            ":sk_prefix",
                            AttributeValue::S(TODO_SORT_PREFIX.to_string()),
                        )
                        .consistent_read(true)
                        .set_exclusive_start_key(start_key.clone());
                    async move {
                        request.send().await.map_err(|e| classify(e.into()))
                    }
                },
                &self.retry,
            )
            .await?;

            for item in output.items() {
                todos.push(item_to_todo(item)?);
            }

            // SK は ULID 昇順なのでページを連結すれば作成順になる
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(todos)
    }

    async fn get(&self, id: &TodoId) -> Result<Option<Todo>, RepositoryError> {
        let output = retry_store_operation(
            || {
                let request = self
                    .db
                    .client()
                    .get_item()
                    .table_name(self.db.table_name())
                    .set_key(Some(DynamoDbKeys::for_todo(id).into_key()))
                    .consistent_read(true);
                async move {
                    request.send().await.map_err(|e| classify(e.into()))
                }
            },
            &self.retry,
        )
        .await?;

        output.item().map(item_to_todo).transpose()
    }

    async fn insert(&self, todo: &Todo) -> Result<(), RepositoryError> {
        retry_store_operation(
            || {
                let request = self
                    .db
                    .client()
                    .put_item()
                    .table_name(self.db.table_name())
                    .set_item(Some(todo_to_item(todo)))
                    .condition_expression("attribute_not_exists(PK)");
                let id = todo.id.clone();
                async move {
                    request.send().await.map_err(|e| match DynamoError::from(e) {
                        DynamoError::ConditionalCheckFailedException(_) => {
                            RepositoryError::Conflict(id)
                        }
                        other => classify(other),
                    })
                }
            },
            &self.retry,
        )
        .await?;

        info!(todo_id = %todo.id, "Todo saved successfully");
        Ok(())
    }

    async fn update(&self, todo: &Todo) -> Result<(), RepositoryError> {
        retry_store_operation(
            || {
                let request = self
                    .db
                    .client()
                    .put_item()
                    .table_name(self.db.table_name())
                    .set_item(Some(todo_to_item(todo)))
                    .condition_expression("attribute_exists(PK)");
                let id = todo.id.clone();
                async move {
                    request.send().await.map_err(|e| match DynamoError::from(e) {
                        DynamoError::ConditionalCheckFailedException(_) => {
                            RepositoryError::NotFound(id)
                        }
                        other => classify(other),
                    })
                }
            },
            &self.retry,
        )
        .await?;

        info!(todo_id = %todo.id, "Todo updated successfully");
        Ok(())
    }

    async fn delete(&self, id: &TodoId) -> Result<bool, RepositoryError> {
        let output = retry_store_operation(
            || {
                let request = self
                    .db
                    .client()
                    .delete_item()
                    .table_name(self.db.table_name())
                    .set_key(Some(DynamoDbKeys::for_todo(id).into_key()))
                    .return_values(ReturnValue::AllOld);
                async move {
                    request.send().await.map_err(|e| classify(e.into()))
                }
            },
            &self.retry,
        )
        .await?;

        let deleted = output.attributes().is_some_and(|attrs| !attrs.is_empty());
        if deleted {
            info!(todo_id = %id, "Todo deleted successfully");
        }
        Ok(deleted)
    }
}
