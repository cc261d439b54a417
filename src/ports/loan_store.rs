use crate::domain::loan::Loan;
use crate::domain::value_objects::{BookId, LoanId, MemberId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 参照整合性エラー
///
/// `create`で参照先の書籍・会員が登録されていない場合に、
/// アダプタはこのエラーをボックス化して返す。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("Book {0} is not registered")]
    UnknownBook(BookId),
    #[error("Member {0} is not registered")]
    UnknownMember(MemberId),
}

/// 書籍の射影（通知文面に必要な分だけ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSummary {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
}

/// 借り手の射影（宛先の連絡先を含む）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowerSummary {
    pub member_id: MemberId,
    pub name: String,
    pub email: String,
}

/// 貸出と関連レコードの射影
///
/// クエリ結果自体に書籍・借り手の情報を含めることで、
/// コア側で結合や追加の取得を行わずにリマインダーを組み立てられる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanDetails {
    pub loan: Loan,
    pub book: BookSummary,
    pub borrower: BorrowerSummary,
}

/// 貸出ストアポート
///
/// 永続化層の境界。時間窓クエリは以下の形を厳密に守ること。
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// IDで貸出を取得する
    async fn get(&self, loan_id: LoanId) -> Result<Option<LoanDetails>>;

    /// 貸出を作成し、射影付きで返す
    ///
    /// 参照先の書籍・会員が存在しない場合は`ReferenceError`。
    async fn create(&self, loan: Loan) -> Result<LoanDetails>;

    /// 貸出を更新する（楽観的排他制御）
    ///
    /// 保存されている`updated_at`が`expected_updated_at`と一致する場合のみ
    /// 1件の貸出をアトミックに置き換え、`true`を返す。
    /// 読み取り後に他の操作が更新していた場合は何もせず`false`を返す。
    ///
    /// 呼び出し側は、書き込む`loan.updated_at`を`expected_updated_at`より
    /// 必ず大きくすること。同じ値のままだと後続の比較が古い読み取りを
    /// 見分けられない。
    async fn update(&self, loan: Loan, expected_updated_at: DateTime<Utc>) -> Result<bool>;

    /// 貸出を削除する（管理操作）
    ///
    /// 削除した場合は`true`、存在しなかった場合は`false`。
    async fn delete(&self, loan_id: LoanId) -> Result<bool>;

    /// すべての貸出
    async fn find_all(&self) -> Result<Vec<LoanDetails>>;

    /// 延滞中：`return_date IS NULL AND due_date < today`
    async fn find_overdue(&self, today: NaiveDate) -> Result<Vec<LoanDetails>>;

    /// 期限日指定：`return_date IS NULL AND due_date = date`
    ///
    /// リマインダー配信は`today + 1`で呼び出す。
    async fn find_due_on(&self, date: NaiveDate) -> Result<Vec<LoanDetails>>;

    /// 貸出中：`return_date IS NULL`（返却期限は問わない）
    async fn find_active(&self) -> Result<Vec<LoanDetails>>;

    /// 会員の全貸出（貸出履歴）
    async fn find_by_member(&self, member_id: MemberId) -> Result<Vec<LoanDetails>>;

    /// 書籍の全貸出（貸出履歴）
    async fn find_by_book(&self, book_id: BookId) -> Result<Vec<LoanDetails>>;
}
