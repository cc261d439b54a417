pub mod clock;
pub mod loan_store;
pub mod notification_gateway;

pub use clock::*;
pub use loan_store::{BookSummary, BorrowerSummary, LoanDetails, LoanStore, ReferenceError};
pub use notification_gateway::{NotificationGateway, SentMessage};
