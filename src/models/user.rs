use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::pool::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Publisher,
    Admin,
}

/// Account entity. The password hash and reset-token fields never leave the
/// server.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl User {
    pub async fn insert(
        pool: &PgPool,
        new: &CreateUser,
        password_hash: &str,
        role: Role,
    ) -> Result<Self, DbError> {
        let row = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO users (id, name, email, role, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(role)
        .bind(password_hash)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn update(pool: &PgPool, id: Uuid, changes: &UpdateUser) -> Result<Self, DbError> {
        let row = sqlx::query_as::<_, Self>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(changes.role)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("Resource not found with id {}", id)))?;
        Ok(row)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, DbError> {
        let row = sqlx::query_as::<_, Self>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Store the hashed reset token and its expiry.
    pub async fn set_reset_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE users SET reset_password_token = $2, reset_password_expire = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Look up a user by an unexpired reset-token digest.
    pub async fn find_by_reset_token(pool: &PgPool, token_hash: &str) -> Result<Option<Self>, DbError> {
        let row = sqlx::query_as::<_, Self>(
            "SELECT * FROM users WHERE reset_password_token = $1 AND reset_password_expire > now()",
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Replace the password hash and clear any outstanding reset token.
    pub async fn set_password(pool: &PgPool, id: Uuid, password_hash: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, reset_password_token = NULL, \
             reset_password_expire = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "John".to_string(),
            email: "john@example.com".to_string(),
            role: Role::Publisher,
            password_hash: "secret-hash".to_string(),
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        };
        let v = serde_json::to_value(&user).unwrap();
        assert!(v.get("password_hash").is_none());
        assert!(v.get("reset_password_token").is_none());
        assert_eq!(v["role"], serde_json::json!("publisher"));
    }
}
