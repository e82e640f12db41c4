//! Lead database operations

use pressops_common::db::models::{Lead, LeadNote, LeadStageHistory};
use pressops_common::Result;
use sqlx::SqlitePool;

pub async fn insert_lead(pool: &SqlitePool, lead: &Lead) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO leads (
            id, name, email, phone, status, assigned_to,
            contract_amount, deadline, deadline_severity,
            converted_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&lead.id)
    .bind(&lead.name)
    .bind(&lead.email)
    .bind(&lead.phone)
    .bind(&lead.status)
    .bind(&lead.assigned_to)
    .bind(lead.contract_amount)
    .bind(lead.deadline)
    .bind(&lead.deadline_severity)
    .bind(lead.converted_at)
    .bind(lead.created_at)
    .bind(lead.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_lead(pool: &SqlitePool, id: &str) -> Result<Option<Lead>> {
    let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(lead)
}

pub async fn list_leads(pool: &SqlitePool, status: Option<&str>) -> Result<Vec<Lead>> {
    let leads = match status {
        Some(s) => {
            sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE status = ? ORDER BY created_at DESC")
                .bind(s)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(leads)
}

pub async fn insert_note(pool: &SqlitePool, note: &LeadNote) -> Result<()> {
    sqlx::query(
        "INSERT INTO lead_notes (id, lead_id, body, created_by, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&note.id)
    .bind(&note.lead_id)
    .bind(&note.body)
    .bind(&note.created_by)
    .bind(note.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_notes(pool: &SqlitePool, lead_id: &str) -> Result<Vec<LeadNote>> {
    let notes = sqlx::query_as::<_, LeadNote>(
        "SELECT * FROM lead_notes WHERE lead_id = ? ORDER BY created_at",
    )
    .bind(lead_id)
    .fetch_all(pool)
    .await?;
    Ok(notes)
}

pub async fn list_stage_history(pool: &SqlitePool, lead_id: &str) -> Result<Vec<LeadStageHistory>> {
    let history = sqlx::query_as::<_, LeadStageHistory>(
        "SELECT * FROM lead_stage_history WHERE lead_id = ? ORDER BY changed_at, id",
    )
    .bind(lead_id)
    .fetch_all(pool)
    .await?;
    Ok(history)
}
