use std::time::Duration;
use thiserror::Error;

/// リマインダー確認間隔のデフォルト（1日の代わりの短い間隔）
pub const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_PORT: u16 = 3000;

/// 設定エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("REMINDER_INTERVAL_SECS must be greater than zero")]
    ZeroInterval,
}

/// アプリケーション設定
///
/// - `REMINDER_INTERVAL_SECS` - リマインダーの確認間隔（秒、デフォルト60）
/// - `DATABASE_URL` - 指定時は PostgreSQL、未指定時はインメモリストア
/// - `PORT` - HTTP ポート（デフォルト3000）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub reminder_interval: Duration,
    pub database_url: Option<String>,
    pub port: u16,
}

impl AppConfig {
    /// 環境変数から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から読み込む（テスト用に環境変数を差し替えられる）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval_secs: u64 = parse_or(
            &lookup,
            "REMINDER_INTERVAL_SECS",
            DEFAULT_REMINDER_INTERVAL_SECS,
        )?;
        if interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let port: u16 = parse_or(&lookup, "PORT", DEFAULT_PORT)?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            reminder_interval: Duration::from_secs(interval_secs),
            database_url,
            port,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}
