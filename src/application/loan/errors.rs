use crate::domain::LifecycleError;
use crate::ports::ReferenceError;
use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound,

    /// 日付の順序不変条件に違反
    #[error("Loan dates are out of order")]
    InvalidDates,

    /// 返却済みの貸出、または不変フィールドへの変更
    #[error("Illegal transition: returned loans and loan identity cannot be changed")]
    IllegalTransition,

    /// 貸出先の書籍または借り手の会員が登録されていない
    #[error(transparent)]
    UnknownReference(#[from] ReferenceError),

    /// 既に返却済み
    #[error("Loan has already been returned")]
    AlreadyReturned,

    /// 手動の延滞通知の対象外（返却済み、または未延滞）
    #[error("Loan is not eligible for an overdue notification")]
    NotEligibleForNotification,

    /// 同じ貸出への同時更新が続き、書き込めなかった
    #[error("Loan was modified concurrently")]
    ConcurrentModification,

    /// 通知ゲートウェイのエラー
    #[error("Notification could not be sent")]
    NotificationSendFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// LoanStoreのエラー
    #[error("Loan store unavailable")]
    StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<LifecycleError> for LoanApplicationError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidDates => LoanApplicationError::InvalidDates,
            LifecycleError::IllegalTransition => LoanApplicationError::IllegalTransition,
            LifecycleError::AlreadyReturned => LoanApplicationError::AlreadyReturned,
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
