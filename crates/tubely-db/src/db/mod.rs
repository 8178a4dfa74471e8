pub mod video;

use sqlx::migrate::Migrator;

/// Schema migrations for the videos table, embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
