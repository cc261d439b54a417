use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rusty_library_circulation::adapters::postgres::PostgresLoanStore;
use rusty_library_circulation::domain::loan::Loan;
use rusty_library_circulation::domain::value_objects::*;
use rusty_library_circulation::ports::{LoanStore, ReferenceError};
use serial_test::serial;

mod common;

use common::date;

// PostgreSQLが必要なため通常は無視される（cargo test -- --ignored で実行）

fn loan(
    book_id: BookId,
    member_id: MemberId,
    loan_date: NaiveDate,
    due_date: NaiveDate,
    return_date: Option<NaiveDate>,
) -> Loan {
    Loan {
        loan_id: LoanId::new(),
        book_id,
        member_id,
        loan_date,
        due_date,
        return_date,
        // TIMESTAMPTZはマイクロ秒精度
        updated_at: DateTime::from_timestamp_micros(Utc::now().timestamp_micros()).unwrap(),
    }
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_create_and_get_materializes_projection() {
    // Arrange
    let pool = common::create_test_pool().await;
    let store = PostgresLoanStore::new(pool);
    let book_id = store.add_book("Dune", "Frank Herbert").await.unwrap();
    let member_id = store.add_member("Alice", "alice@example.com").await.unwrap();

    // Act
    let created = store
        .create(loan(book_id, member_id, date(2024, 3, 1), date(2024, 3, 15), None))
        .await
        .unwrap();

    // Assert
    assert_eq!(created.book.title, "Dune");
    assert_eq!(created.borrower.email, "alice@example.com");

    let fetched = store.get(created.loan.loan_id).await.unwrap().unwrap();
    assert_eq!(fetched.loan.loan_id, created.loan.loan_id);
    assert_eq!(fetched.loan.due_date, date(2024, 3, 15));
    assert_eq!(fetched.loan.return_date, None);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_create_with_unknown_references_is_reference_error() {
    let pool = common::create_test_pool().await;
    let store = PostgresLoanStore::new(pool);
    let book_id = store.add_book("Dune", "Frank Herbert").await.unwrap();
    let member_id = store.add_member("Alice", "alice@example.com").await.unwrap();
    let stranger = MemberId::new();
    let missing_book = BookId::new();

    let unknown_member = store
        .create(loan(book_id, stranger, date(2024, 3, 1), date(2024, 3, 15), None))
        .await
        .unwrap_err();
    let unknown_book = store
        .create(loan(missing_book, member_id, date(2024, 3, 1), date(2024, 3, 15), None))
        .await
        .unwrap_err();

    assert_eq!(
        unknown_member.downcast_ref::<ReferenceError>(),
        Some(&ReferenceError::UnknownMember(stranger))
    );
    assert_eq!(
        unknown_book.downcast_ref::<ReferenceError>(),
        Some(&ReferenceError::UnknownBook(missing_book))
    );
    assert!(store.find_all().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_time_window_queries() {
    // Arrange: 今日 2024-03-15
    let pool = common::create_test_pool().await;
    let store = PostgresLoanStore::new(pool);
    let book_id = store.add_book("Dune", "Frank Herbert").await.unwrap();
    let member_id = store.add_member("Alice", "alice@example.com").await.unwrap();
    let today = date(2024, 3, 15);

    let overdue = store
        .create(loan(book_id, member_id, date(2024, 2, 20), date(2024, 3, 5), None))
        .await
        .unwrap();
    let due_tomorrow = store
        .create(loan(book_id, member_id, date(2024, 3, 2), date(2024, 3, 16), None))
        .await
        .unwrap();
    store
        .create(loan(
            book_id,
            member_id,
            date(2024, 3, 2),
            date(2024, 3, 16),
            Some(date(2024, 3, 10)),
        ))
        .await
        .unwrap();

    // Act
    let found_overdue = store.find_overdue(today).await.unwrap();
    let found_due = store.find_due_on(date(2024, 3, 16)).await.unwrap();
    let found_active = store.find_active().await.unwrap();
    let found_all = store.find_all().await.unwrap();

    // Assert: 返却済みはどの時間窓にも入らない
    assert_eq!(found_overdue.len(), 1);
    assert_eq!(found_overdue[0].loan.loan_id, overdue.loan.loan_id);
    assert_eq!(found_due.len(), 1);
    assert_eq!(found_due[0].loan.loan_id, due_tomorrow.loan.loan_id);
    assert_eq!(found_active.len(), 2);
    assert_eq!(found_all.len(), 3);
    assert_eq!(store.find_by_member(member_id).await.unwrap().len(), 3);
    assert_eq!(store.find_by_book(book_id).await.unwrap().len(), 3);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_update_is_compare_and_swap_on_updated_at() {
    // Arrange
    let pool = common::create_test_pool().await;
    let store = PostgresLoanStore::new(pool);
    let book_id = store.add_book("Dune", "Frank Herbert").await.unwrap();
    let member_id = store.add_member("Alice", "alice@example.com").await.unwrap();
    let created = store
        .create(loan(book_id, member_id, date(2024, 3, 1), date(2024, 3, 15), None))
        .await
        .unwrap();
    let read_at = created.loan.updated_at;

    // Act: 同じ読み取りに基づく2つの書き込み
    let returned = Loan {
        return_date: Some(date(2024, 3, 12)),
        updated_at: read_at + TimeDelta::seconds(1),
        ..created.loan.clone()
    };
    let extended = Loan {
        due_date: date(2024, 3, 29),
        updated_at: read_at + TimeDelta::seconds(2),
        ..created.loan.clone()
    };
    let first = store.update(returned, read_at).await.unwrap();
    let second = store.update(extended, read_at).await.unwrap();

    // Assert: 後の書き込みは失われた更新にならない
    assert!(first);
    assert!(!second);
    let stored = store.get(created.loan.loan_id).await.unwrap().unwrap();
    assert_eq!(stored.loan.return_date, Some(date(2024, 3, 12)));
    assert_eq!(stored.loan.due_date, date(2024, 3, 15));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_delete() {
    let pool = common::create_test_pool().await;
    let store = PostgresLoanStore::new(pool);
    let book_id = store.add_book("Dune", "Frank Herbert").await.unwrap();
    let member_id = store.add_member("Alice", "alice@example.com").await.unwrap();
    let created = store
        .create(loan(book_id, member_id, date(2024, 3, 1), date(2024, 3, 15), None))
        .await
        .unwrap();

    assert!(store.delete(created.loan.loan_id).await.unwrap());
    assert!(!store.delete(created.loan.loan_id).await.unwrap());
    assert!(store.get(created.loan.loan_id).await.unwrap().is_none());
}
