//! Royalty, royalty-config, and sale database operations

use chrono::{DateTime, Utc};
use pressops_common::db::models::{BookRoyaltyConfig, Royalty, Sale};
use pressops_common::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

/// Active per-unit config for a (book, platform) pair. Platform is
/// matched case-insensitively; configs are stored uppercased.
pub async fn get_active_config(
    pool: &SqlitePool,
    book_id: &str,
    platform: &str,
) -> Result<Option<BookRoyaltyConfig>> {
    let config = sqlx::query_as::<_, BookRoyaltyConfig>(
        r#"
        SELECT * FROM book_royalty_configs
        WHERE book_id = ? AND platform = UPPER(?) AND is_active = 1
        "#,
    )
    .bind(book_id)
    .bind(platform)
    .fetch_optional(pool)
    .await?;
    Ok(config)
}

pub async fn upsert_config(
    pool: &SqlitePool,
    book_id: &str,
    platform: &str,
    royalty_amount: f64,
) -> Result<BookRoyaltyConfig> {
    sqlx::query(
        r#"
        INSERT INTO book_royalty_configs (id, book_id, platform, royalty_amount, is_active, created_at)
        VALUES (?, ?, UPPER(?), ?, 1, ?)
        ON CONFLICT(book_id, platform) DO UPDATE SET
            royalty_amount = excluded.royalty_amount,
            is_active = 1
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(book_id)
    .bind(platform)
    .bind(royalty_amount)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let config = get_active_config(pool, book_id, platform)
        .await?
        .ok_or_else(|| pressops_common::Error::Internal("royalty config upsert lost".into()))?;
    Ok(config)
}

pub async fn insert_royalty(pool: &SqlitePool, royalty: &Royalty) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO royalties (
            id, author_id, book_id, sale_id, amount, quantity,
            bucket, period, is_paid, paid_at, payment_ref, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&royalty.id)
    .bind(&royalty.author_id)
    .bind(&royalty.book_id)
    .bind(&royalty.sale_id)
    .bind(royalty.amount)
    .bind(royalty.quantity)
    .bind(&royalty.bucket)
    .bind(&royalty.period)
    .bind(royalty.is_paid)
    .bind(royalty.paid_at)
    .bind(&royalty.payment_ref)
    .bind(royalty.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_royalty(pool: &SqlitePool, id: &str) -> Result<Option<Royalty>> {
    let royalty = sqlx::query_as::<_, Royalty>("SELECT * FROM royalties WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(royalty)
}

pub async fn list_unpaid_for_author(pool: &SqlitePool, author_id: &str) -> Result<Vec<Royalty>> {
    let royalties = sqlx::query_as::<_, Royalty>(
        "SELECT * FROM royalties WHERE author_id = ? AND is_paid = 0 ORDER BY created_at",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await?;
    Ok(royalties)
}

/// Stamp a payout batch paid in one statement.
pub async fn mark_paid_batch(
    tx: &mut Transaction<'_, Sqlite>,
    ids: &[String],
    payment_ref: &str,
    now: DateTime<Utc>,
) -> Result<u64> {
    let sql = format!(
        "UPDATE royalties SET is_paid = 1, paid_at = ?, payment_ref = ? WHERE id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql).bind(now).bind(payment_ref);
    for id in ids {
        query = query.bind(id);
    }
    let result = query.execute(&mut **tx).await?;
    Ok(result.rows_affected())
}

/// Rows of a payout batch, joined with book titles for the per-author
/// notification summary. Unknown ids are silently absent.
pub async fn list_royalties_with_titles(
    tx: &mut Transaction<'_, Sqlite>,
    ids: &[String],
) -> Result<Vec<(Royalty, String)>> {
    let sql = format!(
        "SELECT * FROM royalties WHERE id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query_as::<_, Royalty>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let royalties = query.fetch_all(&mut **tx).await?;

    let mut book_ids: Vec<&str> = royalties.iter().map(|r| r.book_id.as_str()).collect();
    book_ids.sort_unstable();
    book_ids.dedup();

    let mut titles: HashMap<String, String> = HashMap::with_capacity(book_ids.len());
    if !book_ids.is_empty() {
        let sql = format!(
            "SELECT id, title FROM books WHERE id IN ({})",
            placeholders(book_ids.len())
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for id in &book_ids {
            query = query.bind(*id);
        }
        titles = query.fetch_all(&mut **tx).await?.into_iter().collect();
    }

    Ok(royalties
        .into_iter()
        .map(|r| {
            let title = titles.get(&r.book_id).cloned().unwrap_or_default();
            (r, title)
        })
        .collect())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub async fn insert_sale(pool: &SqlitePool, sale: &Sale) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (id, book_id, platform, quantity, amount, sale_date, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.book_id)
    .bind(&sale.platform)
    .bind(sale.quantity)
    .bind(sale.amount)
    .bind(sale.sale_date)
    .bind(sale.created_at)
    .execute(pool)
    .await?;

    Ok(())
}
