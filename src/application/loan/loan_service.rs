use crate::domain::{
    self, commands::*,
    loan::{Loan, Transition},
    value_objects::*,
};
use crate::ports::*;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use std::sync::Arc;

use super::errors::{LoanApplicationError, Result};

/// 同時更新の衝突時に読み直して再試行する最大回数
const MAX_WRITE_ATTEMPTS: usize = 3;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
/// 「今日」も時計ポート経由で注入するため、テストで自由に固定できる。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub loan_store: Arc<dyn LoanStore>,
    pub notification_gateway: Arc<dyn NotificationGateway>,
    pub clock: Arc<dyn Clock>,
}

/// 貸出一覧のフィルタ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanFilter {
    All,
    /// 未返却（返却期限は問わない）
    Active,
    Overdue,
    DueTomorrow,
    ByMember(MemberId),
    ByBook(BookId),
}

/// 編集の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// 変更なし（書き込みは行っていない）
    Unchanged(LoanDetails),
    /// 更新済み
    Updated(LoanDetails),
}

/// 書き込みの`updated_at`（楽観的排他制御のトークン）を決める
///
/// 時計が進んでいなくても、読み取り時のトークンより必ず大きくする。
/// PostgreSQL の TIMESTAMPTZ に合わせてマイクロ秒単位に揃える。
fn next_write_token(read_token: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let micro = TimeDelta::microseconds(1);
    let now = now.duration_trunc(micro).unwrap_or(now);
    let floor = read_token.duration_trunc(micro).unwrap_or(read_token) + micro;
    now.max(floor)
}

/// LoanStoreから貸出を取得するヘルパー関数
///
/// # エラー
/// - StoreUnavailable: 読み込み失敗
/// - LoanNotFound: 貸出が存在しない
pub(crate) async fn load_loan(
    loan_store: &Arc<dyn LoanStore>,
    loan_id: LoanId,
) -> Result<LoanDetails> {
    loan_store
        .get(loan_id)
        .await
        .map_err(LoanApplicationError::StoreUnavailable)?
        .ok_or(LoanApplicationError::LoanNotFound)
}

/// 「現在を読む → 提案を検証 → 新しい値を書く」を1件の貸出に適用する
///
/// `propose`が`None`を返した場合は書き込まない。
/// 読み取り後に他の操作が同じ貸出を更新していた場合は、読み直して
/// `propose`を再評価する（検証も最新の状態に対してやり直される）。
async fn modify_loan<F>(
    deps: &ServiceDependencies,
    loan_id: LoanId,
    mut propose: F,
) -> Result<EditOutcome>
where
    F: FnMut(&Loan) -> Result<Option<Loan>>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let current = load_loan(&deps.loan_store, loan_id).await?;

        let Some(proposed) = propose(&current.loan)? else {
            return Ok(EditOutcome::Unchanged(current));
        };
        let next = Loan {
            updated_at: next_write_token(current.loan.updated_at, proposed.updated_at),
            ..proposed
        };

        let written = deps
            .loan_store
            .update(next.clone(), current.loan.updated_at)
            .await
            .map_err(LoanApplicationError::StoreUnavailable)?;

        if written {
            return Ok(EditOutcome::Updated(LoanDetails {
                loan: next,
                ..current
            }));
        }

        tracing::debug!(%loan_id, attempt, "Loan changed while being modified, re-reading");
    }

    Err(LoanApplicationError::ConcurrentModification)
}

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 貸出日は今日
/// - 返却期限の指定がなければ14日後
/// - 返却期限は貸出日以降（違反時は書き込み前に InvalidDates）
///
/// 書籍・会員の存在確認は永続化層の参照整合性に委ねる。
/// 未登録の場合は UnknownReference（ストア障害とは区別する）。
pub async fn borrow_book(deps: &ServiceDependencies, cmd: BorrowBook) -> Result<LoanDetails> {
    let today = deps.clock.today();

    let loan = domain::loan::open_loan(
        cmd.book_id,
        cmd.member_id,
        today,
        cmd.due_date,
        deps.clock.now(),
    )?;

    let details = deps
        .loan_store
        .create(loan)
        .await
        .map_err(|e| match e.downcast::<ReferenceError>() {
            Ok(reference) => {
                tracing::warn!(
                    book_id = %cmd.book_id,
                    member_id = %cmd.member_id,
                    "Loan rejected: {}",
                    reference
                );
                LoanApplicationError::UnknownReference(*reference)
            }
            Err(e) => LoanApplicationError::StoreUnavailable(e),
        })?;

    tracing::info!(
        loan_id = %details.loan.loan_id,
        book_id = %cmd.book_id,
        member_id = %cmd.member_id,
        due_date = %details.loan.due_date,
        "Loan created"
    );

    Ok(details)
}

/// 貸出の日付を編集する
///
/// ビジネスルール：
/// - 返却済みの貸出は編集不可（IllegalTransition）
/// - 貸出日は変更不可（IllegalTransition）
/// - 返却期限・返却日は貸出日以降（InvalidDates）
/// - すべて同じ値なら書き込まずに`EditOutcome::Unchanged`
pub async fn edit_loan(deps: &ServiceDependencies, cmd: EditLoan) -> Result<EditOutcome> {
    let outcome = modify_loan(deps, cmd.loan_id, |current| {
        let proposed = Loan {
            loan_date: cmd.loan_date,
            due_date: cmd.due_date,
            return_date: cmd.return_date,
            ..current.clone()
        };

        match domain::loan::validate_transition(current, &proposed) {
            Ok(Transition::Unchanged) => Ok(None),
            Ok(Transition::Changed) => Ok(Some(Loan {
                updated_at: deps.clock.now(),
                ..proposed
            })),
            Err(e) => {
                tracing::warn!(loan_id = %cmd.loan_id, error = %e, "Loan edit rejected");
                Err(LoanApplicationError::from(e))
            }
        }
    })
    .await?;

    match &outcome {
        EditOutcome::Unchanged(_) => {
            tracing::info!(loan_id = %cmd.loan_id, "No changes were made to loan")
        }
        EditOutcome::Updated(_) => tracing::info!(loan_id = %cmd.loan_id, "Loan updated"),
    }

    Ok(outcome)
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 延滞していても返却は受け付ける
/// - 既に返却済みの場合は AlreadyReturned（元の返却日を保持）
pub async fn return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<LoanDetails> {
    let outcome = modify_loan(deps, cmd.loan_id, |current| {
        domain::loan::mark_returned(current, deps.clock.today(), deps.clock.now())
            .map(Some)
            .map_err(|e| {
                tracing::warn!(loan_id = %cmd.loan_id, error = %e, "Return rejected");
                LoanApplicationError::from(e)
            })
    })
    .await?;

    match outcome {
        EditOutcome::Updated(details) => {
            tracing::info!(loan_id = %cmd.loan_id, "Book returned");
            Ok(details)
        }
        // mark_returned は常に新しい値を返すため到達しない
        EditOutcome::Unchanged(_) => Err(LoanApplicationError::AlreadyReturned),
    }
}

/// 貸出を削除する（管理操作）
pub async fn delete_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<()> {
    let deleted = deps
        .loan_store
        .delete(loan_id)
        .await
        .map_err(LoanApplicationError::StoreUnavailable)?;

    if !deleted {
        return Err(LoanApplicationError::LoanNotFound);
    }

    tracing::info!(%loan_id, "Loan deleted");
    Ok(())
}

/// IDで貸出を取得する
pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<LoanDetails> {
    load_loan(&deps.loan_store, loan_id).await
}

/// フィルタ付きで貸出一覧を取得する
///
/// 時間窓フィルタは時計ポートの「今日」を基準にする。
pub async fn list_loans(deps: &ServiceDependencies, filter: LoanFilter) -> Result<Vec<LoanDetails>> {
    let store = &deps.loan_store;
    let today = deps.clock.today();

    let loans = match filter {
        LoanFilter::All => store.find_all().await,
        LoanFilter::Active => store.find_active().await,
        LoanFilter::Overdue => store.find_overdue(today).await,
        LoanFilter::DueTomorrow => match today.succ_opt() {
            Some(tomorrow) => store.find_due_on(tomorrow).await,
            None => Ok(Vec::new()),
        },
        LoanFilter::ByMember(member_id) => store.find_by_member(member_id).await,
        LoanFilter::ByBook(book_id) => store.find_by_book(book_id).await,
    };

    loans.map_err(LoanApplicationError::StoreUnavailable)
}
