use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// フィールド単位のバリデーションメッセージ
pub mod messages {
    pub const REQUIRED: &str = "This field is required.";
    pub const MAY_NOT_BE_NULL: &str = "This field may not be null.";
    pub const MAY_NOT_BE_BLANK: &str = "This field may not be blank.";
    pub const INVALID_STRING: &str = "Not a valid string.";
    pub const INVALID_BOOLEAN: &str = "Must be a valid boolean.";

    pub fn max_length(limit: usize) -> String {
        format!("Ensure this field has no more than {limit} characters.")
    }
}

/// 特定フィールドに紐付かないエラーのキー
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Invalid TodoId: {0}")]
    InvalidTodoId(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),
}

/// フィールド名ごとのエラーメッセージ一覧
///
/// JSON ではフィールド名をキー、メッセージ配列を値とするオブジェクトになる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 既にエラーを持つフィールドには追加しない
    pub fn merge_new_fields(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_insert(messages);
        }
    }

    pub fn into_result(self) -> Result<(), DomainError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}
