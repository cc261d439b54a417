use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, MemberId};

/// コマンド：書籍を貸し出す
///
/// `due_date`を省略した場合は貸出日 + 14日。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowBook {
    pub book_id: BookId,
    pub member_id: MemberId,
    pub due_date: Option<NaiveDate>,
}

/// コマンド：貸出の日付を編集する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLoan {
    pub loan_id: LoanId,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub loan_id: LoanId,
}

/// コマンド：延滞通知を手動で送信する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOverdueNotice {
    pub loan_id: LoanId,
}
