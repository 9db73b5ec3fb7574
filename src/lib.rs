pub mod auction;
pub mod bidding;
pub mod chain;
pub mod config;
pub mod custody;
pub mod database;
pub mod error;
pub mod handlers;
pub mod message_broker;
pub mod query;
pub mod scheduler;
pub mod store;
pub mod subscriptions;
