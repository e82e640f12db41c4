//! Notification database operations

use pressops_common::db::models::Notification;
use pressops_common::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Insert within the caller's transaction so notifications commit
/// atomically with the mutation they announce.
pub async fn insert_notification(
    tx: &mut Transaction<'_, Sqlite>,
    notification: &Notification,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, kind, message, is_read, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&notification.id)
    .bind(&notification.user_id)
    .bind(&notification.kind)
    .bind(&notification.message)
    .bind(notification.is_read)
    .bind(notification.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Notification>> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(notifications)
}
