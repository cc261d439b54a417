use chrono::{DateTime, NaiveDate, Utc};

/// 時計ポート
///
/// すべての日付計算の「今日」を提供する。
/// テストでは固定時計に差し替えて決定的にする。
pub trait Clock: Send + Sync {
    /// 現在時刻（監査情報 updated_at 用）
    fn now(&self) -> DateTime<Utc>;

    /// 今日の日付（ステータス導出・期限計算用）
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
