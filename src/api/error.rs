use crate::application::loan::LoanApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(LoanApplicationError);

impl From<LoanApplicationError> for ApiError {
    fn from(err: LoanApplicationError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self.0 {
            // 404 Not Found - リクエストされたリソースが存在しない
            LoanApplicationError::LoanNotFound => {
                (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND", "Loan not found")
            }

            // 422 Unprocessable Entity - ビジネスルール違反（元のデータは保持）
            LoanApplicationError::InvalidDates => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_DATES",
                "Due date and return date cannot be earlier than the loan date",
            ),
            LoanApplicationError::IllegalTransition => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ILLEGAL_TRANSITION",
                "Returned loans cannot be edited",
            ),
            LoanApplicationError::UnknownReference(ref e) => {
                tracing::warn!("Rejected loan with unknown reference: {}", e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "UNKNOWN_REFERENCE",
                    "Book or member is not registered",
                )
            }
            LoanApplicationError::AlreadyReturned => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ALREADY_RETURNED",
                "This loan has already been returned",
            ),
            LoanApplicationError::NotEligibleForNotification => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NOT_ELIGIBLE_FOR_NOTIFICATION",
                "Cannot send overdue notification for non-overdue or returned loans",
            ),

            // 409 Conflict - 同時更新
            LoanApplicationError::ConcurrentModification => (
                StatusCode::CONFLICT,
                "CONCURRENT_MODIFICATION",
                "Loan was modified by another request, please retry",
            ),

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            LoanApplicationError::NotificationSendFailure(ref e) => {
                tracing::error!("Notification gateway error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "NOTIFICATION_SEND_FAILURE",
                    "Failed to send notification",
                )
            }
            LoanApplicationError::StoreUnavailable(ref e) => {
                tracing::error!("Loan store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_UNAVAILABLE",
                    "Failed to access loan records",
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
