use crate::errors::{messages, DomainError, FieldErrors};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock, PoisonError};

/// タイトルの最大文字数
pub const TITLE_MAX_LENGTH: usize = 200;

/// Todo の識別子（ULID 文字列）
///
/// ULID は生成時刻順に並ぶため、識別子の順序がそのまま作成順になる。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

/// 同一ミリ秒内でも単調増加する ULID 生成器
fn generator() -> &'static Mutex<ulid::Generator> {
    static GENERATOR: OnceLock<Mutex<ulid::Generator>> = OnceLock::new();
    GENERATOR.get_or_init(|| Mutex::new(ulid::Generator::new()))
}

impl TodoId {
    pub fn new() -> Self {
        let ulid = generator()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
            // 同一ミリ秒内の乱数部が尽きた場合のみ
            .unwrap_or_else(|_| ulid::Ulid::new());
        Self(ulid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for TodoId {
    type Err = DomainError;

    /// 大文字・小文字を問わず受け付け、正規化した大文字表現で保持する
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s)
            .map(|ulid| Self(ulid.to_string()))
            .map_err(|_| DomainError::InvalidTodoId(s.to_string()))
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// 変更内容から新しい Todo を作成する。title は必須。
    pub fn create(changes: TodoChanges, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let changes = changes.normalized();
        changes.validate(false)?;

        Ok(Self {
            id: TodoId::new(),
            title: changes.title.unwrap_or_default(),
            description: changes.description.unwrap_or_default(),
            completed: changes.completed.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }

    /// 指定されたフィールドのみ上書きし、updated_at を進める
    pub fn apply(&mut self, changes: TodoChanges, now: DateTime<Utc>) -> Result<(), DomainError> {
        let changes = changes.normalized();
        changes.validate(true)?;

        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(completed) = changes.completed {
            self.completed = completed;
        }
        self.updated_at = now.max(self.created_at);
        Ok(())
    }
}

/// 書き込み可能フィールドの変更内容。None のフィールドは変更しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TodoChanges {
    /// 文字列フィールドの前後の空白を取り除く
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
            completed: self.completed,
        }
    }

    /// partial = false の場合は title を必須として検証する
    pub fn field_errors(&self, partial: bool) -> FieldErrors {
        let mut errors = FieldErrors::new();

        match self.title.as_deref().map(str::trim) {
            None if !partial => errors.add("title", messages::REQUIRED),
            None => {}
            Some("") => errors.add("title", messages::MAY_NOT_BE_BLANK),
            Some(title) if title.chars().count() > TITLE_MAX_LENGTH => {
                errors.add("title", messages::max_length(TITLE_MAX_LENGTH))
            }
            Some(_) => {}
        }

        errors
    }

    pub fn validate(&self, partial: bool) -> Result<(), DomainError> {
        self.field_errors(partial).into_result()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}
