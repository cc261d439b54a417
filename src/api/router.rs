use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_loan, delete_loan, edit_loan, get_loan_by_id, list_loans,
    list_sent_notifications, return_book, send_overdue_notice,
};

/// Creates the API router with all loan circulation endpoints
///
/// Command endpoints (Write operations):
/// - POST /loans - Borrow a book
/// - PUT /loans/:id - Edit loan dates
/// - DELETE /loans/:id - Delete a loan (administrative)
/// - POST /loans/:id/return - Return a book
/// - POST /loans/:id/overdue-notice - Send a manual overdue notification
///
/// Query endpoints (Read operations):
/// - GET /loans - List loans with an optional filter
/// - GET /loans/:id - Get loan details
/// - GET /notifications/sent - Sent notifications in send order
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/loans", get(list_loans).post(create_loan))
        .route(
            "/loans/:id",
            get(get_loan_by_id).put(edit_loan).delete(delete_loan),
        )
        .route("/loans/:id/return", post(return_book))
        .route("/loans/:id/overdue-notice", post(send_overdue_notice))
        .route("/notifications/sent", get(list_sent_notifications))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
