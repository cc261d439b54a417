use crate::domain::loan::Loan;
use crate::domain::value_objects::{BookId, LoanId, MemberId};
use crate::ports::loan_store::{
    BookSummary, BorrowerSummary, LoanDetails, LoanStore as LoanStoreTrait, ReferenceError,
    Result,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

/// 外部キー違反を参照整合性エラーに読み替える
fn reference_violation(error: &sqlx::Error, loan: &Loan) -> Option<ReferenceError> {
    match error {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => match db.constraint() {
            Some("loans_book_id_fkey") => Some(ReferenceError::UnknownBook(loan.book_id)),
            _ => Some(ReferenceError::UnknownMember(loan.member_id)),
        },
        _ => None,
    }
}

/// 貸出・書籍・会員を結合した射影の SELECT 句
///
/// すべての時間窓クエリはこの句に WHERE を付けて使う。
const SELECT_LOAN_DETAILS: &str = r#"
    SELECT
        l.loan_id,
        l.book_id,
        l.member_id,
        l.loan_date,
        l.due_date,
        l.return_date,
        l.updated_at,
        b.title,
        b.author,
        m.name,
        m.email
    FROM loans l
    JOIN books b ON b.book_id = l.book_id
    JOIN members m ON m.member_id = l.member_id
"#;

/// PostgreSQLの行データをLoanDetailsに変換する
fn map_row_to_loan_details(row: &PgRow) -> Result<LoanDetails> {
    let book_id = BookId::from_uuid(row.try_get("book_id")?);
    let member_id = MemberId::from_uuid(row.try_get("member_id")?);

    Ok(LoanDetails {
        loan: Loan {
            loan_id: LoanId::from_uuid(row.try_get("loan_id")?),
            book_id,
            member_id,
            loan_date: row.try_get("loan_date")?,
            due_date: row.try_get("due_date")?,
            return_date: row.try_get("return_date")?,
            updated_at: row.try_get("updated_at")?,
        },
        book: BookSummary {
            book_id,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
        },
        borrower: BorrowerSummary {
            member_id,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
        },
    })
}

/// LoanStoreのPostgreSQL実装
///
/// 射影はクエリ自体の JOIN で組み立て、コア側に結合をさせない。
pub struct LoanStore {
    pool: PgPool,
}

impl LoanStore {
    /// PostgreSQLコネクションプールから新しいLoanStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 書籍を登録する
    pub async fn add_book(&self, title: &str, author: &str) -> Result<BookId> {
        let book_id = BookId::new();
        sqlx::query("INSERT INTO books (book_id, title, author) VALUES ($1, $2, $3)")
            .bind(book_id.value())
            .bind(title)
            .bind(author)
            .execute(&self.pool)
            .await?;

        Ok(book_id)
    }

    /// 会員を登録する
    pub async fn add_member(&self, name: &str, email: &str) -> Result<MemberId> {
        let member_id = MemberId::new();
        sqlx::query("INSERT INTO members (member_id, name, email) VALUES ($1, $2, $3)")
            .bind(member_id.value())
            .bind(name)
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(member_id)
    }
}

#[async_trait]
impl LoanStoreTrait for LoanStore {
    async fn get(&self, loan_id: LoanId) -> Result<Option<LoanDetails>> {
        let sql = format!("{SELECT_LOAN_DETAILS} WHERE l.loan_id = $1");
        let row = sqlx::query(&sql)
            .bind(loan_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_loan_details).transpose()
    }

    /// 貸出を作成
    ///
    /// 書籍・会員の参照整合性は外部キー制約で保証される。
    async fn create(&self, loan: Loan) -> Result<LoanDetails> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                book_id,
                member_id,
                loan_date,
                due_date,
                return_date,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.book_id.value())
        .bind(loan.member_id.value())
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.updated_at)
        .execute(&self.pool)
        .await;

        if let Err(e) = inserted {
            return Err(match reference_violation(&e, &loan) {
                Some(reference) => reference.into(),
                None => e.into(),
            });
        }

        self.get(loan.loan_id)
            .await?
            .ok_or_else(|| format!("loan {} missing after insert", loan.loan_id).into())
    }

    /// 貸出を更新（updated_at による比較・置換）
    ///
    /// 1文の UPDATE で比較と書き込みを行うため、1件の貸出に対してアトミック。
    async fn update(&self, loan: Loan, expected_updated_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET
                due_date = $2,
                return_date = $3,
                updated_at = $4
            WHERE loan_id = $1 AND updated_at = $5
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.updated_at)
        .bind(expected_updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, loan_id: LoanId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM loans WHERE loan_id = $1")
            .bind(loan_id.value())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_all(&self) -> Result<Vec<LoanDetails>> {
        let sql = format!("{SELECT_LOAN_DETAILS} ORDER BY l.due_date ASC, l.loan_date ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(map_row_to_loan_details).collect()
    }

    /// 延滞中の貸出（部分インデックス loans_outstanding_due_date_idx を使用）
    async fn find_overdue(&self, today: NaiveDate) -> Result<Vec<LoanDetails>> {
        let sql = format!(
            "{SELECT_LOAN_DETAILS} WHERE l.return_date IS NULL AND l.due_date < $1 \
             ORDER BY l.due_date ASC"
        );
        let rows = sqlx::query(&sql).bind(today).fetch_all(&self.pool).await?;

        rows.iter().map(map_row_to_loan_details).collect()
    }

    async fn find_due_on(&self, date: NaiveDate) -> Result<Vec<LoanDetails>> {
        let sql = format!(
            "{SELECT_LOAN_DETAILS} WHERE l.return_date IS NULL AND l.due_date = $1 \
             ORDER BY l.loan_date ASC"
        );
        let rows = sqlx::query(&sql).bind(date).fetch_all(&self.pool).await?;

        rows.iter().map(map_row_to_loan_details).collect()
    }

    async fn find_active(&self) -> Result<Vec<LoanDetails>> {
        let sql = format!(
            "{SELECT_LOAN_DETAILS} WHERE l.return_date IS NULL ORDER BY l.due_date ASC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(map_row_to_loan_details).collect()
    }

    /// 会員の全貸出を検索（貸出履歴）
    async fn find_by_member(&self, member_id: MemberId) -> Result<Vec<LoanDetails>> {
        let sql = format!(
            "{SELECT_LOAN_DETAILS} WHERE l.member_id = $1 ORDER BY l.loan_date DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(member_id.value())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_loan_details).collect()
    }

    /// 書籍の全貸出を検索（貸出履歴）
    async fn find_by_book(&self, book_id: BookId) -> Result<Vec<LoanDetails>> {
        let sql = format!("{SELECT_LOAN_DETAILS} WHERE l.book_id = $1 ORDER BY l.loan_date DESC");
        let rows = sqlx::query(&sql)
            .bind(book_id.value())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_loan_details).collect()
    }
}
