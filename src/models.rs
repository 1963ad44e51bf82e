pub mod attachment;
pub mod audit;
pub mod auth;
pub mod dashboard;
pub mod installation;
pub mod installation_form;
pub mod share;
