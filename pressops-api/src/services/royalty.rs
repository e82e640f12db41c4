//! Royalty generation and payout
//!
//! Two rules coexist:
//! - Platform sales use a configured per-unit amount per (book,
//!   platform), split across the book's authors by ownership share.
//! - Storefront checkout orders use a flat fraction of the sale amount
//!   paid to the primary author only (no co-author split).
//!
//! A royalty's amount is immutable once written; only the payout fields
//! change afterwards, through `mark_royalties_paid`.

use chrono::Utc;
use pressops_common::db::models::{Notification, Royalty, RoyaltyBucket};
use pressops_common::settings::SiteSettings;
use pressops_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::db::{books, notifications, royalties as db};

/// Result of one generation run
#[derive(Debug, Serialize)]
pub struct GeneratedRoyalties {
    pub royalties: Vec<Royalty>,
    pub royalty_per_unit: f64,
    pub total_royalty: f64,
}

/// Result of a payout batch
#[derive(Debug, Serialize)]
pub struct PayoutSummary {
    pub updated_count: u64,
    pub notified_author_count: usize,
}

/// Generate royalty ledger entries for `quantity` units of a book sold
/// on `platform`, split across the book's authors.
///
/// Share rules: explicit co-author rows are used when any exist, with a
/// null share meaning an equal fraction of the author count; with no
/// co-author rows at all, the primary author holds 100%.
pub async fn generate_royalty(
    pool: &SqlitePool,
    book_id: &str,
    platform: &str,
    quantity: i64,
    period: Option<String>,
    sale_id: Option<&str>,
) -> Result<GeneratedRoyalties> {
    if quantity <= 0 {
        return Err(Error::Validation(format!("Quantity must be positive, got {}", quantity)));
    }

    let book = books::get_book(pool, book_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No book '{}'", book_id)))?;

    let config = db::get_active_config(pool, book_id, platform).await?;
    let per_unit = match config {
        Some(c) if c.royalty_amount > 0.0 => c.royalty_amount,
        _ => {
            return Err(Error::RoyaltyConfigMissing {
                book_title: book.title.clone(),
                platform: platform.to_string(),
            })
        }
    };

    let bucket = RoyaltyBucket::classify(platform);
    let total = per_unit * quantity as f64;
    let period = period.unwrap_or_else(|| Utc::now().format("%Y-%m").to_string());

    let splits = author_splits(pool, &book.id, &book.author_id).await?;
    let now = Utc::now();

    let mut created = Vec::with_capacity(splits.len());
    for (author_id, fraction) in splits {
        let royalty = Royalty {
            id: Uuid::new_v4().to_string(),
            author_id,
            book_id: book.id.clone(),
            sale_id: sale_id.map(str::to_string),
            amount: total * fraction,
            quantity,
            bucket: bucket.as_str().to_string(),
            period: period.clone(),
            is_paid: false,
            paid_at: None,
            payment_ref: None,
            created_at: now,
        };
        db::insert_royalty(pool, &royalty).await?;
        created.push(royalty);
    }

    tracing::info!(
        book_id = %book.id,
        platform = %platform,
        quantity = quantity,
        total = total,
        authors = created.len(),
        "Generated royalties"
    );

    Ok(GeneratedRoyalties {
        royalties: created,
        royalty_per_unit: per_unit,
        total_royalty: total,
    })
}

/// (author id, fraction) pairs for a book.
///
/// The resolved fractions must account for the full amount: generation
/// never divides royalty among an author set whose shares leave money
/// unallocated or over-allocated.
async fn author_splits(
    pool: &SqlitePool,
    book_id: &str,
    primary_author_id: &str,
) -> Result<Vec<(String, f64)>> {
    let co_authors = books::get_co_authors(pool, book_id).await?;
    if co_authors.is_empty() {
        return Ok(vec![(primary_author_id.to_string(), 1.0)]);
    }

    let count = co_authors.len() as f64;
    let splits: Vec<(String, f64)> = co_authors
        .into_iter()
        .map(|a| {
            let fraction = match a.share {
                Some(share) => share / 100.0,
                None => 1.0 / count,
            };
            (a.user_id, fraction)
        })
        .collect();

    let total: f64 = splits.iter().map(|(_, f)| f).sum();
    if (total - 1.0).abs() > SHARE_SUM_EPSILON {
        return Err(Error::Conflict(format!(
            "Co-author shares resolve to {:.1}% of the royalty; they must total 100%",
            total * 100.0
        )));
    }

    Ok(splits)
}

const SHARE_SUM_EPSILON: f64 = 1e-6;

/// Mark a batch of royalties paid and notify each affected author once.
///
/// Re-marking an already-paid royalty is accepted and re-stamps
/// `paid_at` (last write wins).
pub async fn mark_royalties_paid(
    pool: &SqlitePool,
    royalty_ids: &[String],
    payment_ref: &str,
) -> Result<PayoutSummary> {
    // Dedupe so a repeated id can neither double-count a notification
    // total nor inflate the update count
    let mut ids: Vec<String> = royalty_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(PayoutSummary { updated_count: 0, notified_author_count: 0 });
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let updated = db::mark_paid_batch(&mut tx, &ids, payment_ref, now).await?;

    // One notification per author summarizing total and book titles,
    // committed atomically with the paid stamps
    let rows = db::list_royalties_with_titles(&mut tx, &ids).await?;
    let mut per_author: BTreeMap<String, (f64, Vec<String>)> = BTreeMap::new();
    for (royalty, title) in rows {
        let entry = per_author.entry(royalty.author_id).or_default();
        entry.0 += royalty.amount;
        if !entry.1.contains(&title) {
            entry.1.push(title);
        }
    }

    for (author_id, (total, titles)) in &per_author {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: author_id.clone(),
            kind: "royalty_paid".to_string(),
            message: format!(
                "Royalty payment of {:.2} processed for: {} (ref {})",
                total,
                titles.join(", "),
                payment_ref
            ),
            is_read: false,
            created_at: now,
        };
        notifications::insert_notification(&mut tx, &notification).await?;
    }
    tx.commit().await?;

    tracing::info!(
        updated = updated,
        authors = per_author.len(),
        payment_ref = %payment_ref,
        "Marked royalties paid"
    );

    Ok(PayoutSummary {
        updated_count: updated,
        notified_author_count: per_author.len(),
    })
}

/// Storefront-order fallback: one royalty at a flat fraction of the
/// sale amount, attributed solely to the primary author.
pub async fn record_order_royalty(
    pool: &SqlitePool,
    book_id: &str,
    sale_amount: f64,
    quantity: i64,
    sale_id: Option<&str>,
) -> Result<Royalty> {
    if sale_amount < 0.0 {
        return Err(Error::Validation(format!("Sale amount must be non-negative, got {}", sale_amount)));
    }

    let book = books::get_book(pool, book_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No book '{}'", book_id)))?;

    let rate = SiteSettings::load(pool).await?.royalties.order_royalty_rate;
    let now = Utc::now();

    let royalty = Royalty {
        id: Uuid::new_v4().to_string(),
        author_id: book.author_id.clone(),
        book_id: book.id.clone(),
        sale_id: sale_id.map(str::to_string),
        amount: sale_amount * rate,
        quantity,
        bucket: RoyaltyBucket::Website.as_str().to_string(),
        period: now.format("%Y-%m").to_string(),
        is_paid: false,
        paid_at: None,
        payment_ref: None,
        created_at: now,
    };
    db::insert_royalty(pool, &royalty).await?;
    Ok(royalty)
}
