//! Lead pipeline
//!
//! A simpler cousin of the publishing-stage machine: no locking, no
//! visibility. Status writes are unconstrained (custom stages are
//! allowed); every change that differs from the stored value appends a
//! history entry, and the first transition into CONVERTED stamps
//! `converted_at` exactly once.

use chrono::Utc;
use pressops_common::db::models::{lead_status, Lead, LeadNote};
use pressops_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::leads as db;

#[derive(Debug, Clone, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub assigned_to: Option<String>,
    pub contract_amount: Option<f64>,
    pub deadline: Option<chrono::DateTime<Utc>>,
    pub deadline_severity: Option<String>,
}

pub async fn create_lead(pool: &SqlitePool, new: NewLead) -> Result<Lead> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Lead name is required".to_string()));
    }

    let now = Utc::now();
    let lead = Lead {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: new.email,
        phone: new.phone,
        status: lead_status::NEW.to_string(),
        assigned_to: new.assigned_to,
        contract_amount: new.contract_amount,
        deadline: new.deadline,
        deadline_severity: new.deadline_severity,
        converted_at: None,
        created_at: now,
        updated_at: now,
    };
    db::insert_lead(pool, &lead).await?;
    Ok(lead)
}

/// Write a new status. No-op when the status is unchanged; otherwise
/// the update and its history row commit atomically.
pub async fn update_lead_status(
    pool: &SqlitePool,
    lead_id: &str,
    new_status: &str,
    actor_id: &str,
) -> Result<Lead> {
    let new_status = new_status.trim().to_uppercase();
    if new_status.is_empty() {
        return Err(Error::Validation("Status must not be empty".to_string()));
    }

    let mut lead = db::get_lead(pool, lead_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No lead '{}'", lead_id)))?;

    if lead.status == new_status {
        return Ok(lead);
    }

    let now = Utc::now();
    let stamp_converted = new_status == lead_status::CONVERTED && lead.converted_at.is_none();
    let converted_at = if stamp_converted { Some(now) } else { lead.converted_at };

    let mut tx = pool.begin().await.map_err(Error::from)?;
    sqlx::query("UPDATE leads SET status = ?, converted_at = ?, updated_at = ? WHERE id = ?")
        .bind(&new_status)
        .bind(converted_at)
        .bind(now)
        .bind(lead_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::from)?;
    sqlx::query(
        r#"
        INSERT INTO lead_stage_history (id, lead_id, from_status, to_status, changed_by, changed_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(lead_id)
    .bind(&lead.status)
    .bind(&new_status)
    .bind(actor_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(Error::from)?;
    tx.commit().await.map_err(Error::from)?;

    lead.status = new_status;
    lead.converted_at = converted_at;
    lead.updated_at = now;
    Ok(lead)
}

pub async fn add_note(
    pool: &SqlitePool,
    lead_id: &str,
    body: &str,
    actor_id: &str,
) -> Result<LeadNote> {
    let body = body.trim();
    if body.is_empty() {
        return Err(Error::Validation("Note body must not be empty".to_string()));
    }
    db::get_lead(pool, lead_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No lead '{}'", lead_id)))?;

    let note = LeadNote {
        id: Uuid::new_v4().to_string(),
        lead_id: lead_id.to_string(),
        body: body.to_string(),
        created_by: actor_id.to_string(),
        created_at: Utc::now(),
    };
    db::insert_note(pool, &note).await?;
    Ok(note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    async fn lead(pool: &SqlitePool) -> Lead {
        create_lead(
            pool,
            NewLead {
                name: "Prospect".to_string(),
                email: Some("prospect@x.com".to_string()),
                phone: None,
                assigned_to: None,
                contract_amount: None,
                deadline: None,
                deadline_severity: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn converted_at_is_stamped_once_and_survives_lost() {
        let pool = test_pool().await;
        let lead = lead(&pool).await;
        let actor = "admin-1";

        update_lead_status(&pool, &lead.id, "CONTACTED", actor).await.unwrap();
        let converted = update_lead_status(&pool, &lead.id, "CONVERTED", actor).await.unwrap();
        let stamp = converted.converted_at.unwrap();

        // Subsequent LOST neither clears nor resets the stamp
        let lost = update_lead_status(&pool, &lead.id, "LOST", actor).await.unwrap();
        assert_eq!(lost.status, "LOST");
        assert_eq!(lost.converted_at.unwrap(), stamp);

        // Re-entering CONVERTED does not re-stamp
        let again = update_lead_status(&pool, &lead.id, "CONVERTED", actor).await.unwrap();
        assert_eq!(again.converted_at.unwrap(), stamp);
    }

    #[tokio::test]
    async fn history_only_records_actual_changes() {
        let pool = test_pool().await;
        let lead = lead(&pool).await;
        let actor = "admin-1";

        update_lead_status(&pool, &lead.id, "CONTACTED", actor).await.unwrap();
        // Same status again: no-op, no history
        update_lead_status(&pool, &lead.id, "CONTACTED", actor).await.unwrap();
        update_lead_status(&pool, &lead.id, "CONVERTED", actor).await.unwrap();

        let history = db::list_stage_history(&pool, &lead.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from_status, "NEW");
        assert_eq!(history[0].to_status, "CONTACTED");
        assert_eq!(history[1].to_status, "CONVERTED");
        assert!(history.iter().all(|h| h.changed_by == actor));
    }

    #[tokio::test]
    async fn custom_stages_are_accepted() {
        let pool = test_pool().await;
        let lead = lead(&pool).await;

        let updated = update_lead_status(&pool, &lead.id, "awaiting manuscript", "admin-1")
            .await
            .unwrap();
        assert_eq!(updated.status, "AWAITING MANUSCRIPT");
    }

    #[tokio::test]
    async fn notes_require_existing_lead() {
        let pool = test_pool().await;
        let lead = lead(&pool).await;

        add_note(&pool, &lead.id, "Called, call back Monday", "team-1").await.unwrap();
        let notes = db::list_notes(&pool, &lead.id).await.unwrap();
        assert_eq!(notes.len(), 1);

        let err = add_note(&pool, "missing-lead", "x", "team-1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
