pub mod broker;
pub mod handlers;
pub mod history;
pub mod persistence;
pub mod upload;
