//! Database connectivity check

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::HealthStore;
use crate::error::AppResult;

#[derive(Clone)]
pub struct HealthRepository {
    pool: Pool<Postgres>,
}

impl HealthRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthStore for HealthRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
