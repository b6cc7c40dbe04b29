use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::pool::DbError;

/// Child of one bootcamp and one user. UNIQUE (bootcamp_id, user_id) - a
/// user reviews a given bootcamp at most once. Mutations trigger an
/// average-rating recompute on the parent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub rating: i32,
    pub bootcamp_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReview {
    pub title: String,
    pub body: String,
    pub rating: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReview {
    pub title: Option<String>,
    pub body: Option<String>,
    pub rating: Option<i32>,
}

impl Review {
    pub fn validate_rating(rating: i32) -> Result<(), String> {
        if (1..=10).contains(&rating) {
            Ok(())
        } else {
            Err("Rating must be between 1 and 10".to_string())
        }
    }

    pub async fn insert(
        pool: &PgPool,
        bootcamp_id: Uuid,
        author: Uuid,
        new: &CreateReview,
    ) -> Result<Self, DbError> {
        let row = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO reviews (id, title, body, rating, bootcamp_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.body)
        .bind(new.rating)
        .bind(bootcamp_id)
        .bind(author)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn update(pool: &PgPool, id: Uuid, changes: &UpdateReview) -> Result<Self, DbError> {
        let row = sqlx::query_as::<_, Self>(
            r#"
            UPDATE reviews SET
                title = COALESCE($2, title),
                body = COALESCE($3, body),
                rating = COALESCE($4, rating)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.body)
        .bind(changes.rating)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("Resource not found with id {}", id)))?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(Review::validate_rating(1).is_ok());
        assert!(Review::validate_rating(10).is_ok());
        assert!(Review::validate_rating(0).is_err());
        assert!(Review::validate_rating(11).is_err());
    }
}
