//! SQLite implementation of the bridge store.

pub mod config;
pub mod constants;
pub mod errors;
pub mod sqlite;

mod models;
mod types;
