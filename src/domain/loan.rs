use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, LifecycleError, LoanId, MemberId};

/// 貸出期間（日数）
pub const LOAN_PERIOD_DAYS: u64 = 14;

/// Loan - 1冊の書籍の1回の貸出
///
/// 不変条件：
/// - `due_date >= loan_date`（作成時）
/// - `return_date`が存在する場合は`return_date >= loan_date`
/// - `return_date`が設定された貸出は終端状態（監査情報以外は変更不可）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    // 識別子
    pub loan_id: LoanId,

    // 他のレコードへの参照（IDのみ、作成後は不変）
    pub book_id: BookId,
    pub member_id: MemberId,

    // 貸出管理の責務
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,

    // 監査情報
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// 返却済み（終端状態）か
    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }

    /// 監査情報を除くすべてのフィールドが一致するか
    fn same_fields(&self, other: &Loan) -> bool {
        self.loan_id == other.loan_id
            && self.book_id == other.book_id
            && self.member_id == other.member_id
            && self.loan_date == other.loan_date
            && self.due_date == other.due_date
            && self.return_date == other.return_date
    }
}

/// 貸出ステータス
///
/// 保存されず、読み取り時に日付から導出される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// 貸出中（期限まで2日以上）
    Active,
    /// 返却期限が明日
    DueTomorrow,
    /// 延滞中
    Overdue,
    /// 返却済み
    Returned,
}

impl LoanStatus {
    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::DueTomorrow => "due_tomorrow",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LoanStatus::Active),
            "due_tomorrow" => Ok(LoanStatus::DueTomorrow),
            "overdue" => Ok(LoanStatus::Overdue),
            "returned" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

/// 提案された変更の検証結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 変更なし（書き込み不要）
    Unchanged,
    /// 書き込み可能な変更あり
    Changed,
}

/// 純粋関数：書籍を貸し出す
///
/// ビジネスルール：
/// - 貸出日は今日
/// - 返却期限の指定がなければ貸出日 + 14日間
/// - 返却期限は貸出日以降
///
/// 副作用なし。新しいLoanを返す。
pub fn open_loan(
    book_id: BookId,
    member_id: MemberId,
    today: NaiveDate,
    due_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<Loan, LifecycleError> {
    let due_date = match due_date {
        Some(date) => date,
        None => today
            .checked_add_days(Days::new(LOAN_PERIOD_DAYS))
            .ok_or(LifecycleError::InvalidDates)?,
    };

    if due_date < today {
        return Err(LifecycleError::InvalidDates);
    }

    Ok(Loan {
        loan_id: LoanId::new(),
        book_id,
        member_id,
        loan_date: today,
        due_date,
        return_date: None,
        updated_at: now,
    })
}

/// 純粋関数：貸出ステータスを導出する
///
/// - `return_date`あり → Returned
/// - `due_date < today` → Overdue
/// - `due_date == today + 1` → DueTomorrow
/// - それ以外 → Active
pub fn derive_status(loan: &Loan, today: NaiveDate) -> LoanStatus {
    if loan.is_returned() {
        return LoanStatus::Returned;
    }

    if loan.due_date < today {
        LoanStatus::Overdue
    } else if today.succ_opt() == Some(loan.due_date) {
        LoanStatus::DueTomorrow
    } else {
        LoanStatus::Active
    }
}

/// 純粋関数：状態遷移を検証する
///
/// 「現在を読む → 提案を検証 → 新しい値を書く」の検証ステップ。
/// 監査情報（updated_at）は比較対象外。
///
/// # 戻り値
/// - `Transition::Unchanged` - 全フィールドが一致（呼び出し側は書き込みを省略できる）
/// - `Transition::Changed` - 書き込み可能
///
/// # エラー
/// - `IllegalTransition` - 返却済みの貸出への変更、またはID・参照・貸出日の変更
/// - `InvalidDates` - `due_date < loan_date` または `return_date < loan_date`
pub fn validate_transition(current: &Loan, proposed: &Loan) -> Result<Transition, LifecycleError> {
    if current.same_fields(proposed) {
        return Ok(Transition::Unchanged);
    }

    if current.is_returned() {
        return Err(LifecycleError::IllegalTransition);
    }

    // ID・参照・貸出日は作成時に一度だけ設定される
    if current.loan_id != proposed.loan_id
        || current.book_id != proposed.book_id
        || current.member_id != proposed.member_id
        || current.loan_date != proposed.loan_date
    {
        return Err(LifecycleError::IllegalTransition);
    }

    let returned_before_loan = proposed
        .return_date
        .is_some_and(|returned| returned < proposed.loan_date);

    if proposed.due_date < proposed.loan_date || returned_before_loan {
        return Err(LifecycleError::InvalidDates);
    }

    Ok(Transition::Changed)
}

/// 純粋関数：書籍を返却する
///
/// ビジネスルール：
/// - 延滞していても返却は受け付ける
/// - 返却済みの貸出は再返却不可（元の返却日を保持）
///
/// 副作用なし。`return_date = today`, `updated_at = now`のコピーを返す。
pub fn mark_returned(
    loan: &Loan,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Loan, LifecycleError> {
    if loan.is_returned() {
        return Err(LifecycleError::AlreadyReturned);
    }

    if today < loan.loan_date {
        return Err(LifecycleError::InvalidDates);
    }

    Ok(Loan {
        return_date: Some(today),
        updated_at: now,
        ..loan.clone()
    })
}

/// 純粋関数：手動の延滞通知の対象か
///
/// 未返却かつ返却期限を過ぎた貸出のみが対象。
pub fn is_eligible_for_overdue_notice(loan: &Loan, today: NaiveDate) -> bool {
    derive_status(loan, today) == LoanStatus::Overdue
}
