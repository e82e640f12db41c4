//! Publishing-stage database operations
//!
//! Mutations that must pair a stage update with history rows live in
//! `services::stages` inside a single transaction; this module holds
//! the plain reads and inserts.

use pressops_common::db::models::{PublishingStage, StageHistoryEntry};
use pressops_common::Result;
use sqlx::SqlitePool;

pub async fn insert_stage(pool: &SqlitePool, stage: &PublishingStage) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO publishing_stages (
            id, book_id, stage_type, sequence_order, status,
            is_visible, is_locked, assigned_to, due_date, file_link, notes,
            started_at, completed_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&stage.id)
    .bind(&stage.book_id)
    .bind(&stage.stage_type)
    .bind(stage.sequence_order)
    .bind(&stage.status)
    .bind(stage.is_visible)
    .bind(stage.is_locked)
    .bind(&stage.assigned_to)
    .bind(stage.due_date)
    .bind(&stage.file_link)
    .bind(&stage.notes)
    .bind(stage.started_at)
    .bind(stage.completed_at)
    .bind(stage.created_at)
    .bind(stage.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_stage(pool: &SqlitePool, book_id: &str, stage_id: &str) -> Result<Option<PublishingStage>> {
    let stage = sqlx::query_as::<_, PublishingStage>(
        "SELECT * FROM publishing_stages WHERE id = ? AND book_id = ?",
    )
    .bind(stage_id)
    .bind(book_id)
    .fetch_optional(pool)
    .await?;
    Ok(stage)
}

pub async fn stage_type_exists(pool: &SqlitePool, book_id: &str, stage_type: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM publishing_stages WHERE book_id = ? AND stage_type = ?)",
    )
    .bind(book_id)
    .bind(stage_type)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// List a book's stages in workflow order. With `visible_only`, hidden
/// stages are omitted (author-facing view).
pub async fn list_stages(
    pool: &SqlitePool,
    book_id: &str,
    visible_only: bool,
) -> Result<Vec<PublishingStage>> {
    let sql = if visible_only {
        "SELECT * FROM publishing_stages WHERE book_id = ? AND is_visible = 1 ORDER BY sequence_order"
    } else {
        "SELECT * FROM publishing_stages WHERE book_id = ? ORDER BY sequence_order"
    };
    let stages = sqlx::query_as::<_, PublishingStage>(sql)
        .bind(book_id)
        .fetch_all(pool)
        .await?;
    Ok(stages)
}

pub async fn delete_stage(pool: &SqlitePool, stage_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM publishing_stages WHERE id = ?")
        .bind(stage_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_history(pool: &SqlitePool, stage_id: &str) -> Result<Vec<StageHistoryEntry>> {
    let history = sqlx::query_as::<_, StageHistoryEntry>(
        "SELECT * FROM publishing_stage_history WHERE stage_id = ? ORDER BY changed_at, id",
    )
    .bind(stage_id)
    .fetch_all(pool)
    .await?;
    Ok(history)
}
