use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::pool::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "skill_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Child of exactly one bootcamp; creating, updating, or removing one
/// triggers an average-cost recompute on the parent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: f64,
    pub minimum_skill: SkillLevel,
    pub scholarship_available: bool,
    pub bootcamp_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: f64,
    pub minimum_skill: SkillLevel,
    #[serde(default)]
    pub scholarship_available: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<String>,
    pub tuition: Option<f64>,
    pub minimum_skill: Option<SkillLevel>,
    pub scholarship_available: Option<bool>,
}

impl Course {
    pub async fn insert(
        pool: &PgPool,
        bootcamp_id: Uuid,
        owner: Uuid,
        new: &CreateCourse,
    ) -> Result<Self, DbError> {
        let row = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO courses
                (id, title, description, weeks, tuition, minimum_skill,
                 scholarship_available, bootcamp_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.weeks)
        .bind(new.tuition)
        .bind(new.minimum_skill)
        .bind(new.scholarship_available)
        .bind(bootcamp_id)
        .bind(owner)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn update(pool: &PgPool, id: Uuid, changes: &UpdateCourse) -> Result<Self, DbError> {
        let row = sqlx::query_as::<_, Self>(
            r#"
            UPDATE courses SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                weeks = COALESCE($4, weeks),
                tuition = COALESCE($5, tuition),
                minimum_skill = COALESCE($6, minimum_skill),
                scholarship_available = COALESCE($7, scholarship_available)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.weeks)
        .bind(changes.tuition)
        .bind(changes.minimum_skill)
        .bind(changes.scholarship_available)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("Resource not found with id {}", id)))?;
        Ok(row)
    }
}
