//! User database operations

use chrono::Utc;
use pressops_common::db::models::User;
use pressops_common::Result;
use sqlx::SqlitePool;

/// Insert a new user row
pub async fn insert_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, role, author_uid, public_slug, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.role)
    .bind(&user.author_uid)
    .bind(&user.public_slug)
    .bind(user.is_active)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user_by_author_uid(pool: &SqlitePool, uid: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE author_uid = ?")
        .bind(uid)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Case-insensitive email lookup. Emails are stored lowercased, but
/// legacy rows may not be, so compare on LOWER both sides.
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER(?)")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn slug_exists(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE public_slug = ?)")
        .bind(slug)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Persist a freshly generated author UID
pub async fn set_author_uid(pool: &SqlitePool, user_id: &str, uid: &str) -> Result<()> {
    sqlx::query("UPDATE users SET author_uid = ?, updated_at = ? WHERE id = ?")
        .bind(uid)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Soft delete. User rows are never hard-deleted.
pub async fn deactivate_user(pool: &SqlitePool, user_id: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
