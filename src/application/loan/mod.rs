mod errors;
mod loan_service;
mod notification;

pub use errors::{LoanApplicationError, Result};
pub use loan_service::{
    EditOutcome, LoanFilter, ServiceDependencies, borrow_book, delete_loan, edit_loan, get_loan,
    list_loans, return_book,
};
pub use notification::send_overdue_notice;
