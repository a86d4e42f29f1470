//! Append-only snapshot store keyed by identity token.

use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::domain::observation::PriceObservation;

/// Result of one insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// An observation with the same identity already exists. Routine under
    /// idempotent re-ingestion, not an error.
    DuplicateSkipped,
}

#[derive(Clone)]
pub struct ObservationRepository {
    pool: SqlitePool,
}

impl ObservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomic check-and-insert against the identity key.
    ///
    /// The UNIQUE constraint on `hash` is the sole duplicate guard, so
    /// concurrent writers cannot race their way into double rows.
    pub async fn insert(
        &self,
        observation: &PriceObservation,
    ) -> Result<InsertOutcome, sqlx::Error> {
        let result = sqlx::query("INSERT INTO prices (hash, date, name, price) VALUES (?, ?, ?, ?)")
            .bind(&observation.identity)
            .bind(observation.date)
            .bind(&observation.name)
            .bind(observation.price)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                debug!(identity = %observation.identity, "identity already stored");
                Ok(InsertOutcome::DuplicateSkipped)
            }
            Err(err) => Err(err),
        }
    }

    /// All stored observations ordered by (date, name, insertion order).
    pub async fn query_all(&self) -> Result<Vec<PriceObservation>, sqlx::Error> {
        let rows =
            sqlx::query("SELECT hash, date, name, price FROM prices ORDER BY date, name, id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PriceObservation {
                    identity: row.try_get("hash")?,
                    date: row.try_get("date")?,
                    name: row.try_get("name")?,
                    price: row.try_get("price")?,
                })
            })
            .collect()
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM prices")
            .fetch_one(&self.pool)
            .await
    }
}
