//! PostgreSQL adapters.
//!
//! - `PostgresInterviewRepository` - sessions, turns and the atomic turn commit
//! - `PostgresInterviewReader` - nested session listings

mod interview_reader;
mod interview_repository;

pub use interview_reader::PostgresInterviewReader;
pub use interview_repository::PostgresInterviewRepository;

use sqlx::migrate::Migrator;

/// Migrations under `migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
