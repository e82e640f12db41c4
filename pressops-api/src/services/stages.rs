//! Publishing-stage workflow
//!
//! Each book carries at most one stage per type from the fixed
//! vocabulary. Status writes are not constrained to adjacent
//! transitions; the machine's rules are about locking, timestamps, and
//! history:
//!
//! - APPROVED locks the stage. A locked stage rejects changes to
//!   status, assignee, file link, and due date until explicitly
//!   unlocked. Nothing else ever sets the lock.
//! - First entry into IN_PROGRESS stamps `started_at`. APPROVED and
//!   COMPLETED stamp `completed_at`; re-entering PENDING, IN_PROGRESS,
//!   or QUERY_RAISED clears it (reopened work is no longer complete).
//! - Every accepted mutation appends one history row per changed field,
//!   in the same transaction as the stage update.

use chrono::{DateTime, Utc};
use pressops_common::db::models::{PublishingStage, StageStatus, StageType, STAGE_SEQUENCE};
use pressops_common::{Error, Result};
use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::db::stages as db;

/// Patch applied by `update_stage`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StagePatch {
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub file_link: Option<String>,
    pub notes: Option<String>,
    pub is_visible: Option<bool>,
}

impl StagePatch {
    /// Fields gated by the lock. Visibility and notes stay editable on
    /// a locked stage.
    fn touches_locked_fields(&self) -> bool {
        self.status.is_some()
            || self.assigned_to.is_some()
            || self.due_date.is_some()
            || self.file_link.is_some()
    }
}

/// Seed a new book with the full fixed stage sequence.
///
/// Single seeding policy for every creation path: all stages start
/// PENDING and only the first stage is visible.
pub async fn seed_stages(pool: &SqlitePool, book_id: &str) -> Result<Vec<PublishingStage>> {
    let now = Utc::now();
    let mut stages = Vec::with_capacity(STAGE_SEQUENCE.len());
    for (i, stage_type) in STAGE_SEQUENCE.iter().enumerate() {
        let stage = new_stage(book_id, *stage_type, i == 0, now);
        db::insert_stage(pool, &stage).await?;
        stages.push(stage);
    }
    Ok(stages)
}

/// Add a single stage to a book. Fails with Conflict if a stage of
/// that type already exists.
pub async fn create_stage(
    pool: &SqlitePool,
    book_id: &str,
    stage_type: StageType,
) -> Result<PublishingStage> {
    ensure_book_exists(pool, book_id).await?;

    if db::stage_type_exists(pool, book_id, stage_type.as_str()).await? {
        return Err(Error::Conflict("Stage already exists for this book".to_string()));
    }

    let stage = new_stage(book_id, stage_type, true, Utc::now());
    db::insert_stage(pool, &stage).await?;

    tracing::info!(book_id = %book_id, stage_type = %stage_type.as_str(), "Stage added");
    Ok(stage)
}

/// Remove a stage. Only PENDING, unlocked stages may be removed.
pub async fn remove_stage(pool: &SqlitePool, book_id: &str, stage_id: &str) -> Result<()> {
    let stage = fetch_stage(pool, book_id, stage_id).await?;

    if stage.status != StageStatus::Pending.as_str() || stage.is_locked {
        return Err(Error::Conflict(
            "Only pending, unlocked stages can be removed".to_string(),
        ));
    }

    db::delete_stage(pool, &stage.id).await?;
    Ok(())
}

/// Apply a patch to a stage, enforcing the lock and stamping workflow
/// timestamps. The stage update and its history rows commit atomically.
pub async fn update_stage(
    pool: &SqlitePool,
    book_id: &str,
    stage_id: &str,
    patch: StagePatch,
    actor_id: &str,
) -> Result<PublishingStage> {
    let stage = fetch_stage(pool, book_id, stage_id).await?;

    if stage.is_locked && patch.touches_locked_fields() {
        return Err(Error::Conflict(
            "Stage is locked; unlock it before editing".to_string(),
        ));
    }

    let new_status = match &patch.status {
        Some(s) => Some(
            StageStatus::parse(s)
                .ok_or_else(|| Error::Validation(format!("Unknown stage status: '{}'", s)))?,
        ),
        None => None,
    };

    let mut updated = stage.clone();
    let now = Utc::now();

    if let Some(status) = new_status {
        updated.status = status.as_str().to_string();
        if status == StageStatus::InProgress && updated.started_at.is_none() {
            updated.started_at = Some(now);
        }
        if status.is_terminal() {
            updated.completed_at = Some(now);
        } else if status.is_in_flight() {
            updated.completed_at = None;
        }
        if status == StageStatus::Approved {
            updated.is_locked = true;
        }
    }
    if let Some(assignee) = &patch.assigned_to {
        updated.assigned_to = Some(assignee.clone());
    }
    if let Some(due) = patch.due_date {
        updated.due_date = Some(due);
    }
    if let Some(link) = &patch.file_link {
        updated.file_link = Some(link.clone());
    }
    if let Some(notes) = &patch.notes {
        updated.notes = Some(notes.clone());
    }
    if let Some(visible) = patch.is_visible {
        updated.is_visible = visible;
    }
    updated.updated_at = now;

    let mut tx = pool.begin().await.map_err(pressops_common::Error::from)?;
    write_stage(&mut tx, &updated).await?;
    append_changes(&mut tx, &stage, &updated, actor_id, now).await?;
    tx.commit().await.map_err(pressops_common::Error::from)?;

    Ok(updated)
}

/// Lift the lock set by APPROVED. The only way a locked stage becomes
/// editable again.
pub async fn unlock_stage(
    pool: &SqlitePool,
    book_id: &str,
    stage_id: &str,
    actor_id: &str,
) -> Result<PublishingStage> {
    let stage = fetch_stage(pool, book_id, stage_id).await?;
    if !stage.is_locked {
        return Ok(stage);
    }

    let mut updated = stage.clone();
    let now = Utc::now();
    updated.is_locked = false;
    updated.updated_at = now;

    let mut tx = pool.begin().await.map_err(pressops_common::Error::from)?;
    write_stage(&mut tx, &updated).await?;
    insert_history(&mut tx, &stage.id, "locked", Some("true"), Some("false"), actor_id, now).await?;
    tx.commit().await.map_err(pressops_common::Error::from)?;

    tracing::info!(stage_id = %stage_id, "Stage unlocked");
    Ok(updated)
}

fn new_stage(
    book_id: &str,
    stage_type: StageType,
    visible: bool,
    now: DateTime<Utc>,
) -> PublishingStage {
    PublishingStage {
        id: Uuid::new_v4().to_string(),
        book_id: book_id.to_string(),
        stage_type: stage_type.as_str().to_string(),
        sequence_order: stage_type.sequence(),
        status: StageStatus::Pending.as_str().to_string(),
        is_visible: visible,
        is_locked: false,
        assigned_to: None,
        due_date: None,
        file_link: None,
        notes: None,
        started_at: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

async fn fetch_stage(pool: &SqlitePool, book_id: &str, stage_id: &str) -> Result<PublishingStage> {
    db::get_stage(pool, book_id, stage_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No stage '{}' on book '{}'", stage_id, book_id)))
}

async fn ensure_book_exists(pool: &SqlitePool, book_id: &str) -> Result<()> {
    crate::db::books::get_book(pool, book_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::NotFound(format!("No book '{}'", book_id)))
}

async fn write_stage(tx: &mut Transaction<'_, Sqlite>, stage: &PublishingStage) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE publishing_stages SET
            status = ?, is_visible = ?, is_locked = ?, assigned_to = ?,
            due_date = ?, file_link = ?, notes = ?,
            started_at = ?, completed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&stage.status)
    .bind(stage.is_visible)
    .bind(stage.is_locked)
    .bind(&stage.assigned_to)
    .bind(stage.due_date)
    .bind(&stage.file_link)
    .bind(&stage.notes)
    .bind(stage.started_at)
    .bind(stage.completed_at)
    .bind(stage.updated_at)
    .bind(&stage.id)
    .execute(&mut **tx)
    .await
    .map_err(pressops_common::Error::from)?;

    Ok(())
}

/// One history row per changed field category.
async fn append_changes(
    tx: &mut Transaction<'_, Sqlite>,
    old: &PublishingStage,
    new: &PublishingStage,
    actor_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let changes: [(&str, Option<String>, Option<String>); 6] = [
        ("status", some_if_ne(&old.status, &new.status), Some(new.status.clone())),
        ("assignee", diff(&old.assigned_to, &new.assigned_to), new.assigned_to.clone()),
        (
            "due_date",
            diff_fmt(&old.due_date, &new.due_date),
            new.due_date.map(|d| d.to_rfc3339()),
        ),
        ("file_link", diff(&old.file_link, &new.file_link), new.file_link.clone()),
        ("notes", diff(&old.notes, &new.notes), new.notes.clone()),
        (
            "visibility",
            some_if_ne(&old.is_visible.to_string(), &new.is_visible.to_string()),
            Some(new.is_visible.to_string()),
        ),
    ];

    for (field, old_value, new_value) in changes {
        // old_value is Some only when the field actually changed
        let Some(old_value) = old_value else { continue };
        insert_history(tx, &new.id, field, Some(&old_value), new_value.as_deref(), actor_id, now)
            .await?;
    }

    Ok(())
}

async fn insert_history(
    tx: &mut Transaction<'_, Sqlite>,
    stage_id: &str,
    field: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    actor_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO publishing_stage_history (id, stage_id, field, old_value, new_value, changed_by, changed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(stage_id)
    .bind(field)
    .bind(old_value)
    .bind(new_value)
    .bind(actor_id)
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(pressops_common::Error::from)?;

    Ok(())
}

fn some_if_ne(old: &str, new: &str) -> Option<String> {
    if old != new {
        Some(old.to_string())
    } else {
        None
    }
}

/// Old value when an optional text field changed, sentinel "" for None.
fn diff(old: &Option<String>, new: &Option<String>) -> Option<String> {
    if old != new {
        Some(old.clone().unwrap_or_default())
    } else {
        None
    }
}

fn diff_fmt(old: &Option<DateTime<Utc>>, new: &Option<DateTime<Utc>>) -> Option<String> {
    if old != new {
        Some(old.map(|d| d.to_rfc3339()).unwrap_or_default())
    } else {
        None
    }
}
