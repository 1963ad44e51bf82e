pub mod attachments;
pub mod audit;
pub mod dashboard;
pub mod health;
pub mod installations;
pub mod share;
