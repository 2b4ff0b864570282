use crate::repositories::RepositoryError;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use domain::{Todo, TodoId};
use std::collections::HashMap;

/// 全 Todo を格納するパーティション
pub const TODO_PARTITION: &str = "TODO";
/// Todo アイテムのソートキー接頭辞
pub const TODO_SORT_PREFIX: &str = "TODO#";

/// DynamoDB Single Table Design のキー構造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoDbKeys {
    pub pk: String, // パーティションキー
    pub sk: String, // ソートキー
}

impl DynamoDbKeys {
    pub fn for_todo(todo_id: &TodoId) -> Self {
        Self {
            pk: TODO_PARTITION.to_string(),
            sk: format!("{TODO_SORT_PREFIX}{todo_id}"),
        }
    }

    pub fn into_key(self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("PK".to_string(), AttributeValue::S(self.pk)),
            ("SK".to_string(), AttributeValue::S(self.sk)),
        ])
    }
}

/// Todo を DynamoDB アイテムに変換
pub fn todo_to_item(todo: &Todo) -> HashMap<String, AttributeValue> {
    let mut item = DynamoDbKeys::for_todo(&todo.id).into_key();
    item.insert("EntityType".to_string(), AttributeValue::S("Todo".to_string()));
    item.insert("id".to_string(), AttributeValue::S(todo.id.to_string()));
    item.insert("title".to_string(), AttributeValue::S(todo.title.clone()));
    item.insert(
        "description".to_string(),
        AttributeValue::S(todo.description.clone()),
    );
    item.insert("completed".to_string(), AttributeValue::Bool(todo.completed));
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(todo.created_at.to_rfc3339()),
    );
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(todo.updated_at.to_rfc3339()),
    );
    item
}

/// DynamoDB アイテムから Todo を復元
pub fn item_to_todo(item: &HashMap<String, AttributeValue>) -> Result<Todo, RepositoryError> {
    let id = string_attr(item, "id")?
        .parse::<TodoId>()
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    Ok(Todo {
        id,
        title: string_attr(item, "title")?.to_string(),
        description: string_attr(item, "description")?.to_string(),
        completed: *item
            .get("completed")
            .and_then(|v| v.as_bool().ok())
            .ok_or_else(|| missing("completed"))?,
        created_at: timestamp_attr(item, "created_at")?,
        updated_at: timestamp_attr(item, "updated_at")?,
    })
}

fn missing(name: &str) -> RepositoryError {
    RepositoryError::Serialization(format!("missing or malformed attribute: {name}"))
}

fn string_attr<'a>(
    item: &'a HashMap<String, AttributeValue>,
    name: &str,
) -> Result<&'a str, RepositoryError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(String::as_str)
        .ok_or_else(|| missing(name))
}

fn timestamp_attr(
    item: &HashMap<String, AttributeValue>,
    name: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw = string_attr(item, name)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Serialization(format!("{name}: {e}")))
}
