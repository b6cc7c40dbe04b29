use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::pool::{Db, DbError};

/// Recomputes the derived aggregates on a bootcamp from its child records:
/// mean course tuition (rounded up to the nearest 10) and mean review rating
/// (stored raw).
///
/// Handlers call this after a child write commits. Recomputation for a given
/// bootcamp id is serialized through a per-id mutex so two concurrent child
/// writes cannot interleave their read-recompute-store cycles; the recompute
/// that runs last sees every committed row. Errors are logged and swallowed:
/// a failed aggregate refresh must not fail the request that triggered it.
pub struct Recalculator {
    db: Db,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl Recalculator {
    pub fn new(db: Db) -> Self {
        Self { db, locks: Mutex::new(HashMap::new()) }
    }

    /// Refresh `average_cost` from the bootcamp's remaining courses.
    pub async fn recalculate_cost(&self, bootcamp_id: Uuid) {
        let guard = self.lock_for(bootcamp_id).await;
        let _held = guard.lock().await;
        if let Err(e) = self.refresh_cost(bootcamp_id).await {
            tracing::error!(%bootcamp_id, "average cost recompute failed: {}", e);
        }
    }

    /// Refresh `average_rating` from the bootcamp's remaining reviews.
    pub async fn recalculate_rating(&self, bootcamp_id: Uuid) {
        let guard = self.lock_for(bootcamp_id).await;
        let _held = guard.lock().await;
        if let Err(e) = self.refresh_rating(bootcamp_id).await {
            tracing::error!(%bootcamp_id, "average rating recompute failed: {}", e);
        }
    }

    async fn refresh_cost(&self, bootcamp_id: Uuid) -> Result<(), DbError> {
        let mean: Option<f64> =
            sqlx::query_scalar("SELECT AVG(tuition)::float8 FROM courses WHERE bootcamp_id = $1")
                .bind(bootcamp_id)
                .fetch_one(self.db.pool())
                .await?;

        // No courses left: the aggregate goes back to NULL instead of
        // keeping a stale value or erroring on the empty group.
        let average_cost = mean.map(round_up_to_ten);

        sqlx::query("UPDATE bootcamps SET average_cost = $2 WHERE id = $1")
            .bind(bootcamp_id)
            .bind(average_cost)
            .execute(self.db.pool())
            .await?;

        tracing::debug!(%bootcamp_id, ?average_cost, "average cost refreshed");
        Ok(())
    }

    async fn refresh_rating(&self, bootcamp_id: Uuid) -> Result<(), DbError> {
        let mean: Option<f64> =
            sqlx::query_scalar("SELECT AVG(rating)::float8 FROM reviews WHERE bootcamp_id = $1")
                .bind(bootcamp_id)
                .fetch_one(self.db.pool())
                .await?;

        sqlx::query("UPDATE bootcamps SET average_rating = $2 WHERE id = $1")
            .bind(bootcamp_id)
            .bind(mean)
            .execute(self.db.pool())
            .await?;

        tracing::debug!(%bootcamp_id, average_rating = ?mean, "average rating refreshed");
        Ok(())
    }

    async fn lock_for(&self, bootcamp_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(bootcamp_id).or_default().clone()
    }
}

/// Cost aggregates round the mean up to the nearest multiple of 10.
pub fn round_up_to_ten(mean: f64) -> i32 {
    ((mean / 10.0).ceil() * 10.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiples_stay_put() {
        assert_eq!(round_up_to_ten(100.0), 100);
        assert_eq!(round_up_to_ten(0.0), 0);
    }

    #[test]
    fn means_round_up_not_to_nearest() {
        // two courses at 100 and 115: mean 107.5 rounds up to 110
        assert_eq!(round_up_to_ten(107.5), 110);
        assert_eq!(round_up_to_ten(101.0), 110);
        assert_eq!(round_up_to_ten(109.99), 110);
    }

    #[test]
    fn empty_group_maps_to_none() {
        let mean: Option<f64> = None;
        assert_eq!(mean.map(round_up_to_ten), None);
    }
}
