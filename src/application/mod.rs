pub mod loan;
pub mod reminder;
