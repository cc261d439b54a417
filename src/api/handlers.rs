use crate::application::loan::{
    EditOutcome, LoanApplicationError, ServiceDependencies, borrow_book as execute_borrow_book,
    delete_loan as execute_delete_loan, edit_loan as execute_edit_loan, get_loan as execute_get_loan,
    list_loans as execute_list_loans, return_book as execute_return_book,
    send_overdue_notice as execute_send_overdue_notice,
};
use crate::domain::commands::{ReturnBook, SendOverdueNotice};
use crate::domain::value_objects::LoanId;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        BorrowBookRequest, EditLoanRequest, EditLoanResponse, ErrorResponse, ListLoansQuery,
        LoanResponse, SentMessageResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Command handlers (POST / PUT / DELETE)
// ============================================================================

/// POST /loans - 新しい貸出を作成
///
/// 貸出日は今日、返却期限は指定がなければ14日後。
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowBookRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let details = execute_borrow_book(&state.service_deps, req.to_command()).await?;
    let today = state.service_deps.clock.today();

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse::from_details(details, today)),
    ))
}

/// PUT /loans/:id - 貸出の日付を編集
///
/// 強制されるビジネスルール:
/// - 返却済みの貸出は編集不可
/// - 返却期限・返却日は貸出日以降
/// - 変更がなければ書き込まずに`changed: false`を返す
pub async fn edit_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
    Json(req): Json<EditLoanRequest>,
) -> Result<Json<EditLoanResponse>, ApiError> {
    let cmd = req.to_command(LoanId::from_uuid(loan_id));
    let outcome = execute_edit_loan(&state.service_deps, cmd).await?;
    let today = state.service_deps.clock.today();

    let (changed, details) = match outcome {
        EditOutcome::Unchanged(details) => (false, details),
        EditOutcome::Updated(details) => (true, details),
    };

    Ok(Json(EditLoanResponse {
        changed,
        loan: LoanResponse::from_details(details, today),
    }))
}

/// POST /loans/:id/return - 書籍を返却
///
/// 強制されるビジネスルール:
/// - 既に返却済みでないこと
/// - 延滞中の貸出も返却可能
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let cmd = ReturnBook {
        loan_id: LoanId::from_uuid(loan_id),
    };

    let details = execute_return_book(&state.service_deps, cmd).await?;
    let today = state.service_deps.clock.today();

    Ok(Json(LoanResponse::from_details(details, today)))
}

/// DELETE /loans/:id - 貸出を削除（管理操作）
pub async fn delete_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    execute_delete_loan(&state.service_deps, LoanId::from_uuid(loan_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /loans/:id/overdue-notice - 延滞通知を手動送信
///
/// 未返却かつ返却期限を過ぎた貸出のみ。重複送信の抑止はしない。
pub async fn send_overdue_notice(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<SentMessageResponse>, ApiError> {
    let cmd = SendOverdueNotice {
        loan_id: LoanId::from_uuid(loan_id),
    };

    let sent = execute_send_overdue_notice(&state.service_deps, cmd).await?;
    Ok(Json(SentMessageResponse::from(sent)))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /loans/:id - 貸出詳細をIDで取得
pub async fn get_loan_by_id(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, QueryError> {
    let loan_id = LoanId::from_uuid(loan_id);
    let details = execute_get_loan(&state.service_deps, loan_id).await?;
    let today = state.service_deps.clock.today();

    Ok(Json(LoanResponse::from_details(details, today)))
}

/// GET /loans - オプションフィルタ付き貸出一覧取得
///
/// クエリパラメータ（いずれか1つ）:
/// - status: active（未返却すべて）, overdue, due_tomorrow
/// - member_id: 会員IDでフィルタリング
/// - book_id: 書籍IDでフィルタリング
///
/// フィルタが指定されない場合は全貸出を返す。
pub async fn list_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListLoansQuery>,
) -> Result<Json<Vec<LoanResponse>>, QueryError> {
    let filter = query.to_filter().map_err(QueryError::BadRequest)?;
    let loans = execute_list_loans(&state.service_deps, filter).await?;
    let today = state.service_deps.clock.today();

    Ok(Json(
        loans
            .into_iter()
            .map(|details| LoanResponse::from_details(details, today))
            .collect(),
    ))
}

/// GET /notifications/sent - 送信済み通知を送信順に取得
pub async fn list_sent_notifications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SentMessageResponse>>, QueryError> {
    let sent = state
        .service_deps
        .notification_gateway
        .list_sent()
        .await
        .map_err(|e| QueryError::InternalError(e.to_string()))?;

    Ok(Json(sent.into_iter().map(SentMessageResponse::from).collect()))
}

// ============================================================================
// Error types
// ============================================================================

/// クエリハンドラー用のエラー型
#[derive(Debug)]
pub enum QueryError {
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

impl From<LoanApplicationError> for QueryError {
    fn from(err: LoanApplicationError) -> Self {
        match err {
            LoanApplicationError::LoanNotFound => QueryError::NotFound(err.to_string()),
            other => QueryError::InternalError(match std::error::Error::source(&other) {
                Some(source) => format!("{}: {}", other, source),
                None => other.to_string(),
            }),
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            QueryError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            QueryError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            QueryError::InternalError(msg) => {
                // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
                tracing::error!("Internal error in query handler: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
