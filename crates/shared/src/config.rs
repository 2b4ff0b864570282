use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Todo の永続化先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    DynamoDb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "dynamodb" => Ok(Self::DynamoDb),
            _ => Err(ConfigError::InvalidValue {
                name: "STORAGE_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

/// ログの出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(ConfigError::InvalidValue {
                name: "LOG_FORMAT",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub storage_backend: StorageBackend,
    pub dynamodb_table: String,
    pub dynamodb_endpoint: Option<String>,
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    /// `"<回数>/<期間>"` 形式。None ならスロットリング無効。
    pub throttle_user_rate: Option<String>,
    pub throttle_num_proxies: Option<usize>,
    pub jwt_secret: Option<String>,
    /// 空なら全オリジンを許可
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: "dev".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_format: LogFormat::Pretty,
            storage_backend: StorageBackend::Memory,
            dynamodb_table: "todo-viewset-dev".to_string(),
            dynamodb_endpoint: None,
            retry_max_attempts: 3,
            retry_initial_delay_ms: 100,
            throttle_user_rate: Some("1000/day".to_string()),
            throttle_num_proxies: None,
            jwt_secret: None,
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を組み立てる（テストでは HashMap を渡す）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get("ENVIRONMENT").unwrap_or(defaults.environment);
        let log_format = match get("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None if environment == "dev" => LogFormat::Pretty,
            None => LogFormat::Json,
        };

        let throttle_user_rate = match lookup("THROTTLE_USER_RATE") {
            Some(value) if value.trim().is_empty() || value.trim().eq_ignore_ascii_case("none") => {
                None
            }
            Some(value) => Some(value.trim().to_string()),
            None => defaults.throttle_user_rate,
        };

        Ok(Config {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            log_format,
            storage_backend: match get("STORAGE_BACKEND") {
                Some(value) => value.parse()?,
                None => defaults.storage_backend,
            },
            dynamodb_table: get("DYNAMODB_TABLE").unwrap_or(defaults.dynamodb_table),
            dynamodb_endpoint: get("DYNAMODB_ENDPOINT"),
            retry_max_attempts: parse_or(
                "RETRY_MAX_ATTEMPTS",
                get("RETRY_MAX_ATTEMPTS"),
                defaults.retry_max_attempts,
            )?,
            retry_initial_delay_ms: parse_or(
                "RETRY_INITIAL_DELAY_MS",
                get("RETRY_INITIAL_DELAY_MS"),
                defaults.retry_initial_delay_ms,
            )?,
            throttle_user_rate,
            throttle_num_proxies: get("THROTTLE_NUM_PROXIES")
                .map(|value| parse_value("THROTTLE_NUM_PROXIES", value))
                .transpose()?,
            jwt_secret: get("JWT_SECRET"),
            cors_origins: get("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            environment,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value })
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    value.map_or(Ok(default), |v| parse_value(name, v))
}
