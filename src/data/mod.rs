//! Page handling, record tables and storage
//!
//! Document loading, page scrapers and the SQLite loader.

pub mod database;
pub mod fetch;
pub mod page;
pub mod scrapers;
pub mod table;

pub use database::Database;
pub use fetch::PageFetcher;
