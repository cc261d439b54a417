use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 送信記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// 通知ゲートウェイポート
///
/// 会員への通知配信メカニズムを抽象化する。
/// 送信したメッセージは少なくとも1回ログに記録される。
/// 実装はメール、SMSなどに差し替え可能。
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// メッセージを送信し、送信時刻付きで記録する
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<SentMessage>;

    /// 送信済みメッセージを送信順に返す
    async fn list_sent(&self) -> Result<Vec<SentMessage>>;
}
