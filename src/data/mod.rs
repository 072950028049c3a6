//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Federation host store contract

mod database;
mod models;
mod store;

pub use database::Database;
pub use models::*;
pub use store::FederationHostStore;

#[cfg(test)]
mod database_test;
