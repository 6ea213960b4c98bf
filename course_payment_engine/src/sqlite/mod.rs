//! SQLite backend for the course payment engine.
//!
//! [`SqliteDatabase`] implements every backend trait in [`crate::traits`]. The low-level queries live in [`db`].
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
