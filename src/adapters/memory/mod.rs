pub mod loan_store;
pub mod notification_gateway;

pub use loan_store::LoanStore as InMemoryLoanStore;
pub use notification_gateway::NotificationGateway as RecordingNotificationGateway;
