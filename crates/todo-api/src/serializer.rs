//! リクエストボディ（JSON）を Todo の変更内容へ変換する
//!
//! 型エラーと必須・空文字などのドメイン検証をまとめて収集し、
//! フィールドごとに最初のエラーだけを返す。読み取り専用フィールドと未知のフィールドは無視する。

use domain::{messages, FieldErrors, TodoChanges, NON_FIELD_ERRORS};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// `partial = false` は作成・全体更新（title 必須）、`true` は部分更新
pub fn parse_changes(body: &[u8], partial: bool) -> Result<TodoChanges, ApiError> {
    let object = parse_object(body)?;
    let mut errors = FieldErrors::new();

    let changes = TodoChanges {
        title: string_field(&object, "title", &mut errors),
        description: string_field(&object, "description", &mut errors),
        completed: bool_field(&object, "completed", &mut errors),
    };

    errors.merge_new_fields(changes.clone().normalized().field_errors(partial));

    if errors.is_empty() {
        Ok(changes)
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    // 空ボディは空オブジェクトとして扱う
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("JSON parse error - {e}")))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::Validation(FieldErrors::single(
            NON_FIELD_ERRORS,
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                type_name(&other)
            ),
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// 数値は文字列に変換して受け付ける
fn string_field(
    object: &Map<String, Value>,
    name: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match object.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => {
            errors.add(name, messages::MAY_NOT_BE_NULL);
            None
        }
        _ => {
            errors.add(name, messages::INVALID_STRING);
            None
        }
    }
}

fn bool_field(object: &Map<String, Value>, name: &str, errors: &mut FieldErrors) -> Option<bool> {
    let parsed = match object.get(name)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 1.0 => Some(true),
            Some(v) if v == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        Value::Null => {
            errors.add(name, messages::MAY_NOT_BE_NULL);
            return None;
        }
        _ => None,
    };

    if parsed.is_none() {
        errors.add(name, messages::INVALID_BOOLEAN);
    }
    parsed
}
