use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::loan::LoanFilter;
use crate::domain::commands::{BorrowBook, EditLoan};
use crate::domain::loan::derive_status;
use crate::domain::value_objects::{BookId, LoanId, MemberId};
use crate::ports::LoanDetails;

/// 貸出一覧取得のクエリパラメータ
///
/// 指定できるフィルタは1つまで。
#[derive(Debug, Default, Deserialize)]
pub struct ListLoansQuery {
    /// active（未返却すべて）, overdue, due_tomorrow
    pub status: Option<String>,
    /// 会員IDでフィルタリング
    pub member_id: Option<Uuid>,
    /// 書籍IDでフィルタリング
    pub book_id: Option<Uuid>,
}

impl ListLoansQuery {
    /// クエリパラメータをフィルタに変換する
    pub fn to_filter(&self) -> Result<LoanFilter, String> {
        match (&self.status, self.member_id, self.book_id) {
            (None, None, None) => Ok(LoanFilter::All),
            (Some(status), None, None) => parse_status_filter(status),
            (None, Some(member_id), None) => Ok(LoanFilter::ByMember(MemberId::from_uuid(member_id))),
            (None, None, Some(book_id)) => Ok(LoanFilter::ByBook(BookId::from_uuid(book_id))),
            _ => Err("Only one of status, member_id, book_id may be given".to_string()),
        }
    }
}

/// ステータスクエリパラメータのパースとバリデーション
pub fn parse_status_filter(status: &str) -> Result<LoanFilter, String> {
    match status {
        "active" => Ok(LoanFilter::Active),
        "overdue" => Ok(LoanFilter::Overdue),
        "due_tomorrow" => Ok(LoanFilter::DueTomorrow),
        _ => Err(format!("Invalid status filter: {}", status)),
    }
}

/// 貸出リクエスト（POST /loans）
#[derive(Debug, Serialize, Deserialize)]
pub struct BorrowBookRequest {
    pub book_id: Uuid,
    pub member_id: Uuid,
    /// 省略時は14日後
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl BorrowBookRequest {
    pub fn to_command(&self) -> BorrowBook {
        BorrowBook {
            book_id: BookId::from_uuid(self.book_id),
            member_id: MemberId::from_uuid(self.member_id),
            due_date: self.due_date,
        }
    }
}

/// 編集リクエスト（PUT /loans/:id）
#[derive(Debug, Serialize, Deserialize)]
pub struct EditLoanRequest {
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
}

impl EditLoanRequest {
    pub fn to_command(&self, loan_id: LoanId) -> EditLoan {
        EditLoan {
            loan_id,
            loan_date: self.loan_date,
            due_date: self.due_date,
            return_date: self.return_date,
        }
    }
}

/// 貸出レスポンス
///
/// `status`は今日を基準に導出した値（active, due_tomorrow, overdue, returned）。
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanResponse {
    pub loan_id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub member_id: Uuid,
    pub borrower_name: String,
    pub borrower_email: String,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl LoanResponse {
    pub fn from_details(details: LoanDetails, today: NaiveDate) -> Self {
        let status = derive_status(&details.loan, today);
        Self {
            loan_id: details.loan.loan_id.value(),
            book_id: details.loan.book_id.value(),
            book_title: details.book.title,
            member_id: details.loan.member_id.value(),
            borrower_name: details.borrower.name,
            borrower_email: details.borrower.email,
            loan_date: details.loan.loan_date,
            due_date: details.loan.due_date,
            return_date: details.loan.return_date,
            status: status.as_str().to_string(),
            updated_at: details.loan.updated_at,
        }
    }
}

/// 編集レスポンス（PUT /loans/:id）
#[derive(Debug, Serialize, Deserialize)]
pub struct EditLoanResponse {
    /// 書き込みを行ったか（false は「変更なし」）
    pub changed: bool,
    pub loan: LoanResponse,
}

/// 送信済み通知（POST /loans/:id/overdue-notice, GET /notifications/sent）
#[derive(Debug, Serialize, Deserialize)]
pub struct SentMessageResponse {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl From<crate::ports::SentMessage> for SentMessageResponse {
    fn from(message: crate::ports::SentMessage) -> Self {
        Self {
            to: message.to,
            subject: message.subject,
            body: message.body,
            sent_at: message.sent_at,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
