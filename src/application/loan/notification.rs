use crate::domain::{self, commands::SendOverdueNotice, reminder::overdue_notice};
use crate::ports::SentMessage;

use super::errors::{LoanApplicationError, Result};
use super::loan_service::{ServiceDependencies, load_loan};

/// 延滞通知を手動で送信する
///
/// ビジネスルール：
/// - 未返却かつ返却期限を過ぎた貸出のみ対象
/// - 対象外の場合は NotEligibleForNotification（ゲートウェイは呼ばない）
/// - 重複送信の抑止はしない（同じ依頼を繰り返せば毎回送信される）
///
/// 自動リマインダー（明日期限）とは別の文面を使う。
pub async fn send_overdue_notice(
    deps: &ServiceDependencies,
    cmd: SendOverdueNotice,
) -> Result<SentMessage> {
    let details = load_loan(&deps.loan_store, cmd.loan_id).await?;
    let today = deps.clock.today();

    if !domain::loan::is_eligible_for_overdue_notice(&details.loan, today) {
        tracing::warn!(
            loan_id = %cmd.loan_id,
            due_date = %details.loan.due_date,
            returned = details.loan.is_returned(),
            "Cannot send overdue notification for non-overdue or returned loan"
        );
        return Err(LoanApplicationError::NotEligibleForNotification);
    }

    let notice = overdue_notice(
        &details.borrower.name,
        &details.borrower.email,
        &details.book.title,
        details.loan.due_date,
    );

    let sent = deps
        .notification_gateway
        .send(&notice.recipient, &notice.subject, &notice.body)
        .await
        .map_err(|e| {
            tracing::error!(loan_id = %cmd.loan_id, error = %e, "Overdue notification failed");
            LoanApplicationError::NotificationSendFailure(e)
        })?;

    tracing::info!(loan_id = %cmd.loan_id, to = %sent.to, "Overdue notification sent");
    Ok(sent)
}
