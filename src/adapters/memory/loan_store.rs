use crate::domain::loan::Loan;
use crate::domain::value_objects::{BookId, LoanId, MemberId};
use crate::ports::loan_store::{
    BookSummary, BorrowerSummary, LoanDetails, LoanStore as LoanStoreTrait, ReferenceError,
    Result,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    books: HashMap<BookId, BookSummary>,
    members: HashMap<MemberId, BorrowerSummary>,
    loans: HashMap<LoanId, Loan>,
}

impl Tables {
    fn details(&self, loan: &Loan) -> Option<LoanDetails> {
        Some(LoanDetails {
            loan: loan.clone(),
            book: self.books.get(&loan.book_id)?.clone(),
            borrower: self.members.get(&loan.member_id)?.clone(),
        })
    }

    /// 条件に合う貸出を射影付きで返す（返却期限、貸出日の順）
    fn select(&self, predicate: impl Fn(&Loan) -> bool) -> Vec<LoanDetails> {
        let mut found: Vec<LoanDetails> = self
            .loans
            .values()
            .filter(|loan| predicate(loan))
            .filter_map(|loan| self.details(loan))
            .collect();
        found.sort_by_key(|d| (d.loan.due_date, d.loan.loan_date));
        found
    }
}

/// LoanStoreのインメモリ実装
///
/// 書籍・会員の登録簿と貸出を1つのミューテックスで保持する。
/// 1件の貸出の読み取り・比較・置き換えはロック内で完結するため、
/// 部分的な更新が外から見えることはない。
pub struct LoanStore {
    tables: Mutex<Tables>,
}

impl LoanStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    /// 書籍を登録する
    pub fn add_book(&self, title: &str, author: &str) -> BookId {
        let book_id = BookId::new();
        self.tables.lock().unwrap().books.insert(
            book_id,
            BookSummary {
                book_id,
                title: title.to_string(),
                author: author.to_string(),
            },
        );
        book_id
    }

    /// 会員を登録する
    pub fn add_member(&self, name: &str, email: &str) -> MemberId {
        let member_id = MemberId::new();
        self.tables.lock().unwrap().members.insert(
            member_id,
            BorrowerSummary {
                member_id,
                name: name.to_string(),
                email: email.to_string(),
            },
        );
        member_id
    }

    /// 検証を経ずに貸出を直接書き込む（テストデータ用）
    pub fn insert_loan(&self, loan: Loan) {
        self.tables.lock().unwrap().loans.insert(loan.loan_id, loan);
    }
}

impl Default for LoanStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanStoreTrait for LoanStore {
    async fn get(&self, loan_id: LoanId) -> Result<Option<LoanDetails>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.loans.get(&loan_id).and_then(|loan| tables.details(loan)))
    }

    async fn create(&self, loan: Loan) -> Result<LoanDetails> {
        let mut tables = self.tables.lock().unwrap();

        if !tables.books.contains_key(&loan.book_id) {
            return Err(Box::new(ReferenceError::UnknownBook(loan.book_id)));
        }
        if !tables.members.contains_key(&loan.member_id) {
            return Err(Box::new(ReferenceError::UnknownMember(loan.member_id)));
        }

        tables.loans.insert(loan.loan_id, loan.clone());
        tables
            .details(&loan)
            .ok_or_else(|| "loan projection missing after insert".into())
    }

    async fn update(&self, loan: Loan, expected_updated_at: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();

        match tables.loans.get_mut(&loan.loan_id) {
            Some(stored) if stored.updated_at == expected_updated_at => {
                *stored = loan;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, loan_id: LoanId) -> Result<bool> {
        Ok(self.tables.lock().unwrap().loans.remove(&loan_id).is_some())
    }

    async fn find_all(&self) -> Result<Vec<LoanDetails>> {
        Ok(self.tables.lock().unwrap().select(|_| true))
    }

    async fn find_overdue(&self, today: NaiveDate) -> Result<Vec<LoanDetails>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .select(|l| l.return_date.is_none() && l.due_date < today))
    }

    async fn find_due_on(&self, date: NaiveDate) -> Result<Vec<LoanDetails>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .select(|l| l.return_date.is_none() && l.due_date == date))
    }

    async fn find_active(&self) -> Result<Vec<LoanDetails>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .select(|l| l.return_date.is_none()))
    }

    async fn find_by_member(&self, member_id: MemberId) -> Result<Vec<LoanDetails>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .select(|l| l.member_id == member_id))
    }

    async fn find_by_book(&self, book_id: BookId) -> Result<Vec<LoanDetails>> {
        Ok(self.tables.lock().unwrap().select(|l| l.book_id == book_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn loan(book_id: BookId, member_id: MemberId, due_day: u32) -> Loan {
        Loan {
            loan_id: LoanId::new(),
            book_id,
            member_id,
            loan_date: date(1),
            due_date: date(due_day),
            return_date: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_references() {
        let store = LoanStore::new();
        let book_id = store.add_book("Dune", "Frank Herbert");
        let member_id = store.add_member("Alice", "alice@example.com");

        let missing_book = BookId::new();
        let stranger = MemberId::new();

        let unknown_book = store.create(loan(missing_book, member_id, 15)).await.unwrap_err();
        let unknown_member = store.create(loan(book_id, stranger, 15)).await.unwrap_err();

        assert_eq!(
            unknown_book.downcast_ref::<ReferenceError>(),
            Some(&ReferenceError::UnknownBook(missing_book))
        );
        assert_eq!(
            unknown_member.downcast_ref::<ReferenceError>(),
            Some(&ReferenceError::UnknownMember(stranger))
        );
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_rejects_stale_token() {
        let store = LoanStore::new();
        let book_id = store.add_book("Dune", "Frank Herbert");
        let member_id = store.add_member("Alice", "alice@example.com");
        let created = store.create(loan(book_id, member_id, 15)).await.unwrap();
        let read_at = created.loan.updated_at;

        let returned = Loan {
            return_date: Some(date(10)),
            updated_at: read_at + TimeDelta::seconds(1),
            ..created.loan.clone()
        };
        let extended = Loan {
            due_date: date(29),
            updated_at: read_at + TimeDelta::seconds(2),
            ..created.loan.clone()
        };

        assert!(store.update(returned, read_at).await.unwrap());
        assert!(!store.update(extended, read_at).await.unwrap());

        let stored = store.get(created.loan.loan_id).await.unwrap().unwrap();
        assert_eq!(stored.loan.return_date, Some(date(10)));
        assert_eq!(stored.loan.due_date, date(15));
    }

    #[tokio::test]
    async fn test_update_of_missing_loan_writes_nothing() {
        let store = LoanStore::new();
        let book_id = store.add_book("Dune", "Frank Herbert");
        let member_id = store.add_member("Alice", "alice@example.com");
        let orphan = loan(book_id, member_id, 15);

        assert!(!store.update(orphan.clone(), orphan.updated_at).await.unwrap());
        assert!(store.get(orphan.loan_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_queries_order_by_due_date() {
        let store = LoanStore::new();
        let book_id = store.add_book("Dune", "Frank Herbert");
        let member_id = store.add_member("Alice", "alice@example.com");
        let later = store.create(loan(book_id, member_id, 20)).await.unwrap();
        let sooner = store.create(loan(book_id, member_id, 5)).await.unwrap();

        let active = store.find_active().await.unwrap();

        assert_eq!(active[0].loan.loan_id, sooner.loan.loan_id);
        assert_eq!(active[1].loan.loan_id, later.loan.loan_id);
        assert_eq!(store.find_overdue(date(15)).await.unwrap().len(), 1);
        assert_eq!(store.find_due_on(date(20)).await.unwrap().len(), 1);
    }
}
