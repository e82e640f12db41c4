//! Typed site settings
//!
//! Site configuration lives in the `settings` table as one JSON
//! document per category key. All reads and writes go through
//! [`SiteSettings`]; handlers never touch raw setting keys.

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

const KEY_GENERAL: &str = "general";
const KEY_LEADS: &str = "leads";
const KEY_ROYALTIES: &str = "royalties";

/// General site identity settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralSettings {
    pub site_name: String,
    pub contact_email: String,
    pub currency: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            site_name: "PressOps".to_string(),
            contact_email: "ops@example.com".to_string(),
            currency: "INR".to_string(),
        }
    }
}

/// Lead-pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LeadSettings {
    /// Custom stages accepted in addition to the standard vocabulary.
    /// Lead status writes are unconstrained; this list only drives
    /// pipeline views.
    pub custom_stages: Vec<String>,
}

impl Default for LeadSettings {
    fn default() -> Self {
        Self { custom_stages: Vec::new() }
    }
}

/// Royalty settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoyaltySettings {
    /// Flat fraction of sale amount paid to the primary author on
    /// storefront checkout orders (the simpler rule, distinct from the
    /// configurable per-unit rates used for platform sales).
    pub order_royalty_rate: f64,
}

impl Default for RoyaltySettings {
    fn default() -> Self {
        Self { order_royalty_rate: 0.10 }
    }
}

/// Aggregate of every settings category; the single load/save boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SiteSettings {
    pub general: GeneralSettings,
    pub leads: LeadSettings,
    pub royalties: RoyaltySettings,
}

impl SiteSettings {
    /// Load all categories, falling back to defaults for any missing
    /// or unparseable category document.
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        Ok(Self {
            general: load_category(pool, KEY_GENERAL).await?,
            leads: load_category(pool, KEY_LEADS).await?,
            royalties: load_category(pool, KEY_ROYALTIES).await?,
        })
    }

    /// Persist all categories.
    pub async fn save(&self, pool: &SqlitePool) -> Result<()> {
        save_category(pool, KEY_GENERAL, &self.general).await?;
        save_category(pool, KEY_LEADS, &self.leads).await?;
        save_category(pool, KEY_ROYALTIES, &self.royalties).await?;
        Ok(())
    }

    /// Write defaults for any category not yet present. Existing
    /// values are left untouched.
    pub async fn ensure_defaults(pool: &SqlitePool) -> Result<()> {
        ensure_category(pool, KEY_GENERAL, &GeneralSettings::default()).await?;
        ensure_category(pool, KEY_LEADS, &LeadSettings::default()).await?;
        ensure_category(pool, KEY_ROYALTIES, &RoyaltySettings::default()).await?;
        Ok(())
    }
}

async fn load_category<T: Default + for<'de> Deserialize<'de>>(
    pool: &SqlitePool,
    key: &str,
) -> Result<T> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?
        .flatten();

    Ok(value
        .and_then(|v| serde_json::from_str(&v).ok())
        .unwrap_or_default())
}

async fn save_category<T: Serialize>(pool: &SqlitePool, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| crate::Error::Internal(format!("settings serialization: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(json)
    .execute(pool)
    .await?;

    Ok(())
}

async fn ensure_category<T: Serialize>(pool: &SqlitePool, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| crate::Error::Internal(format!("settings serialization: {}", e)))?;

    // INSERT OR IGNORE so concurrent initializers cannot clobber each other
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(json)
        .execute(pool)
        .await?;

    Ok(())
}
