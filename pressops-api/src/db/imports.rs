//! Import-batch database operations

use pressops_common::db::models::ImportBatch;
use pressops_common::Result;
use sqlx::SqlitePool;

pub async fn insert_batch(pool: &SqlitePool, batch: &ImportBatch) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO import_batches (
            id, import_type, total_rows, success_count, skipped_count,
            error_count, row_detail, status, created_at, completed_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&batch.id)
    .bind(&batch.import_type)
    .bind(batch.total_rows)
    .bind(batch.success_count)
    .bind(batch.skipped_count)
    .bind(batch.error_count)
    .bind(&batch.row_detail)
    .bind(&batch.status)
    .bind(batch.created_at)
    .bind(batch.completed_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_batches(pool: &SqlitePool) -> Result<Vec<ImportBatch>> {
    let batches = sqlx::query_as::<_, ImportBatch>(
        "SELECT * FROM import_batches ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(batches)
}
