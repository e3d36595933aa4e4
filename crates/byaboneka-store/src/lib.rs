//! Persistence layer for the Byaboneka+ core.
//!
//! Two implementations of the `byaboneka-core` storage traits:
//!   • [`PgStore`] — PostgreSQL via sqlx, the production backend
//!   • [`MemoryStore`] — mutex-guarded in-memory twin for tests/development
//!
//! Compound operations (verification pass/fail, redemption, dispute
//! resolution) are single transactions; PostgreSQL serializes them per claim
//! with `SELECT … FOR UPDATE` on the claim row.

pub mod memory;
pub mod postgres;
mod rows;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Default connection cap; the pool is the single contended resource.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Connect a bounded pool and run pending migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("connecting to postgres")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;

    Ok(pool)
}
