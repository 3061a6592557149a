//! SQLite backend for the order-to-cash pipeline.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
