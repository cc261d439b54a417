use thiserror::Error;

/// 貸出ライフサイクルのエラー
///
/// いずれも書き込み前に検出され、元のデータは保持される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// 日付の順序不変条件に違反（返却期限・返却日が貸出日より前）
    #[error("Loan dates are out of order")]
    InvalidDates,

    /// 終端状態（返却済み）の貸出、または不変フィールドへの変更
    #[error("Returned loans cannot be edited")]
    IllegalTransition,

    /// 既に返却済み
    #[error("Loan has already been returned")]
    AlreadyReturned,
}
