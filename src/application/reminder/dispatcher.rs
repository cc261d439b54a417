use chrono::NaiveDate;

use crate::application::loan::{LoanApplicationError, Result, ServiceDependencies};
use crate::domain::loan::{LoanStatus, derive_status};
use crate::domain::reminder::due_tomorrow_reminder;

/// 1回のリマインダー配信サイクルの集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// `find_due_on(today + 1)` が返した件数
    pub candidates: usize,
    /// 送信に成功した件数
    pub sent: usize,
    /// 送信に失敗した件数（次のサイクルで再評価される）
    pub failed: usize,
    /// 送信しなかった件数（対象外、またはキャンセル後で未着手）
    pub skipped: usize,
}

/// リマインダー配信サイクル（明日が返却期限の貸出へ通知）
///
/// 処理フロー：
/// 1. `target = today + 1` で LoanStore から候補を取得
/// 2. 各候補について：
///    - ライフサイクルで DueTomorrow であることを確認
///    - 固定文面のリマインダーを借り手の連絡先宛てに組み立て
///    - 通知ゲートウェイで送信（失敗してもその貸出だけをスキップして続行）
/// 3. 集計を返す
///
/// # 既知の制限
///
/// サイクル間で「今日は通知済み」の記録は持たない。同じ日に2回実行すると、
/// 明日期限の同じ貸出に重複して送信される。間隔が1日以上である前提の仕様で、
/// 厳密に1日1回にしたい場合は送信記録を明示的に追加する必要がある。
///
/// # エラー
/// 候補の取得に失敗した場合は StoreUnavailable（このサイクルは中止）
pub async fn run_cycle(deps: &ServiceDependencies, today: NaiveDate) -> Result<CycleReport> {
    run_cycle_until(deps, today, || false).await
}

/// キャンセル可能なリマインダー配信サイクル
///
/// 各貸出の送信前に`should_stop`を確認し、`true`なら新しい貸出には着手しない。
/// 送信中のものは完了を待つ。
pub async fn run_cycle_until<F>(
    deps: &ServiceDependencies,
    today: NaiveDate,
    should_stop: F,
) -> Result<CycleReport>
where
    F: Fn() -> bool,
{
    let Some(target) = today.succ_opt() else {
        return Ok(CycleReport::default());
    };

    let candidates = deps
        .loan_store
        .find_due_on(target)
        .await
        .map_err(LoanApplicationError::StoreUnavailable)?;

    let mut report = CycleReport {
        candidates: candidates.len(),
        ..CycleReport::default()
    };

    for (index, details) in candidates.iter().enumerate() {
        if should_stop() {
            report.skipped += candidates.len() - index;
            tracing::info!(remaining = candidates.len() - index, "Reminder cycle cancelled");
            break;
        }

        // 読み取りと同時に返却された貸出などはここで除外される
        if derive_status(&details.loan, today) != LoanStatus::DueTomorrow {
            report.skipped += 1;
            continue;
        }

        let reminder = due_tomorrow_reminder(
            &details.borrower.name,
            &details.borrower.email,
            &details.book.title,
        );

        match deps
            .notification_gateway
            .send(&reminder.recipient, &reminder.subject, &reminder.body)
            .await
        {
            Ok(_) => report.sent += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    loan_id = %details.loan.loan_id,
                    to = %reminder.recipient,
                    error = %e,
                    "Failed to send due-tomorrow reminder"
                );
            }
        }
    }

    tracing::info!(
        %today,
        candidates = report.candidates,
        sent = report.sent,
        failed = report.failed,
        skipped = report.skipped,
        "Reminder cycle finished"
    );

    Ok(report)
}
