//! PostgreSQL store.
//!
//! One `PgStore` over a bounded pool implements every storage trait. Trait
//! impls are split by entity family; the compound operations open a
//! transaction and lock the claim row (`FOR UPDATE`) so concurrent writers
//! on the same claim serialize at the database.

mod activity;
mod claims;
mod handover;
mod items;
mod matches;
mod trust;
mod users;

use sqlx::PgPool;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
