use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewUser, ObjectId, User};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    let user: User = sqlx::query_as(
        r#"
            INSERT INTO users (id, name, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *;
        "#,
    )
    .bind(ObjectId::new())
    .bind(user.name)
    .bind(user.email)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ User {} created", user.id);
    Ok(user)
}

pub async fn fetch_user(user_id: &ObjectId, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn user_exists(user_id: &ObjectId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)").bind(user_id).fetch_one(conn).await?;
    Ok(exists)
}

/// Bumps the user's `updated_at`, taking the write lock for the current transaction. Returns `false` if the user does
/// not exist.
pub async fn lock_user(user_id: &ObjectId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET updated_at = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
