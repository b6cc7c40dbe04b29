use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::pool::DbError;

/// Parent entity of the directory. `average_cost` and `average_rating` are
/// derived from courses/reviews and never accepted from clients.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub careers: Vec<String>,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub average_cost: Option<i32>,
    pub average_rating: Option<f64>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBootcamp {
    pub name: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub careers: Vec<String>,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBootcamp {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl Bootcamp {
    pub async fn insert(pool: &PgPool, owner: Uuid, new: &CreateBootcamp) -> Result<Self, DbError> {
        let row = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO bootcamps
                (id, name, slug, description, website, phone, email, address,
                 latitude, longitude, careers, housing, job_assistance,
                 job_guarantee, accept_gi, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(slugify(&new.name))
        .bind(&new.description)
        .bind(&new.website)
        .bind(&new.phone)
        .bind(&new.email)
        .bind(&new.address)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(&new.careers)
        .bind(new.housing)
        .bind(new.job_assistance)
        .bind(new.job_guarantee)
        .bind(new.accept_gi)
        .bind(owner)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// Partial update; absent fields keep their stored values. The slug
    /// tracks the name.
    pub async fn update(pool: &PgPool, id: Uuid, changes: &UpdateBootcamp) -> Result<Self, DbError> {
        let slug = changes.name.as_deref().map(slugify);
        let row = sqlx::query_as::<_, Self>(
            r#"
            UPDATE bootcamps SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                website = COALESCE($5, website),
                phone = COALESCE($6, phone),
                email = COALESCE($7, email),
                address = COALESCE($8, address),
                latitude = COALESCE($9, latitude),
                longitude = COALESCE($10, longitude),
                careers = COALESCE($11, careers),
                housing = COALESCE($12, housing),
                job_assistance = COALESCE($13, job_assistance),
                job_guarantee = COALESCE($14, job_guarantee),
                accept_gi = COALESCE($15, accept_gi)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(slug)
        .bind(&changes.description)
        .bind(&changes.website)
        .bind(&changes.phone)
        .bind(&changes.email)
        .bind(&changes.address)
        .bind(changes.latitude)
        .bind(changes.longitude)
        .bind(&changes.careers)
        .bind(changes.housing)
        .bind(changes.job_assistance)
        .bind(changes.job_guarantee)
        .bind(changes.accept_gi)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("Resource not found with id {}", id)))?;
        Ok(row)
    }
}

/// URL slug derived from the bootcamp name: lowercase, alphanumeric runs
/// joined by single dashes.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
