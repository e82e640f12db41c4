//! Database initialization
//!
//! Creates the schema on first run and is safe to call repeatedly
//! (`CREATE TABLE IF NOT EXISTS` throughout). Each table function is
//! public so tests can initialize exactly the tables they need against
//! an in-memory pool.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys and WAL for concurrent request handling
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_all_tables(&pool).await?;

    // Seed typed site settings with defaults for any missing category
    crate::settings::SiteSettings::ensure_defaults(&pool).await?;

    Ok(pool)
}

/// Create every table. Idempotent.
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_counters_table(pool).await?;
    create_users_table(pool).await?;
    create_books_table(pool).await?;
    create_book_authors_table(pool).await?;
    create_publishing_stages_table(pool).await?;
    create_stage_history_table(pool).await?;
    create_royalty_configs_table(pool).await?;
    create_sales_table(pool).await?;
    create_royalties_table(pool).await?;
    create_notifications_table(pool).await?;
    create_leads_table(pool).await?;
    create_lead_notes_table(pool).await?;
    create_lead_stage_history_table(pool).await?;
    create_import_batches_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// One row per settings category; values are JSON documents owned by
/// the typed aggregates in `crate::settings`.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the counters table and seed the author-UID sequence
///
/// The author-UID counter must only ever be bumped with a single atomic
/// UPDATE, never read-then-write.
pub async fn create_counters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS counters (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO counters (name, value) VALUES ('author_uid', 0)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the users table
pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'AUTHOR' CHECK (role IN ('AUTHOR', 'ADMIN', 'TEAM')),
            author_uid TEXT UNIQUE,
            public_slug TEXT UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_author_uid ON users(author_uid)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the books table
///
/// The paperback ISBN is the canonical identifier for matching incoming
/// sales rows and is unique across books.
pub async fn create_books_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author_id TEXT NOT NULL REFERENCES users(id),
            status TEXT NOT NULL DEFAULT 'DRAFT' CHECK (status IN ('DRAFT', 'IN_PROGRESS', 'UNDER_REVIEW', 'FORMATTING', 'PUBLISHED', 'ON_HOLD')),
            isbn_paperback TEXT UNIQUE,
            isbn_hardcover TEXT,
            isbn_ebook TEXT,
            price_paperback REAL,
            price_hardcover REAL,
            price_ebook REAL,
            is_listed INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_author ON books(author_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_isbn_paperback ON books(isbn_paperback)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the book_authors co-author link table
pub async fn create_book_authors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS book_authors (
            book_id TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id),
            share REAL,
            PRIMARY KEY (book_id, user_id),
            CHECK (share IS NULL OR (share >= 0 AND share <= 100))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the publishing_stages table
///
/// At most one stage of a given type per book.
pub async fn create_publishing_stages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS publishing_stages (
            id TEXT PRIMARY KEY,
            book_id TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            stage_type TEXT NOT NULL,
            sequence_order INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN ('PENDING', 'IN_PROGRESS', 'AWAITING_APPROVAL', 'APPROVED', 'QUERY_RAISED', 'COMPLETED')),
            is_visible INTEGER NOT NULL DEFAULT 1,
            is_locked INTEGER NOT NULL DEFAULT 0,
            assigned_to TEXT REFERENCES users(id),
            due_date TIMESTAMP,
            file_link TEXT,
            notes TEXT,
            started_at TIMESTAMP,
            completed_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (book_id, stage_type)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_stages_book ON publishing_stages(book_id, sequence_order)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the publishing_stage_history table
pub async fn create_stage_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS publishing_stage_history (
            id TEXT PRIMARY KEY,
            stage_id TEXT NOT NULL REFERENCES publishing_stages(id) ON DELETE CASCADE,
            field TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT,
            changed_by TEXT NOT NULL,
            changed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_stage_history_stage ON publishing_stage_history(stage_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the book_royalty_configs table
///
/// One per-unit rate per (book, platform). Absence of an active row
/// means royalty generation for that pair fails with a remedy message.
pub async fn create_royalty_configs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS book_royalty_configs (
            id TEXT PRIMARY KEY,
            book_id TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            platform TEXT NOT NULL,
            royalty_amount REAL NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (book_id, platform),
            CHECK (royalty_amount >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the sales table
pub async fn create_sales_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sales (
            id TEXT PRIMARY KEY,
            book_id TEXT NOT NULL REFERENCES books(id),
            platform TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 1,
            amount REAL NOT NULL,
            sale_date TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (quantity > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sales_book ON sales(book_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the royalties ledger table
pub async fn create_royalties_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS royalties (
            id TEXT PRIMARY KEY,
            author_id TEXT NOT NULL REFERENCES users(id),
            book_id TEXT NOT NULL REFERENCES books(id),
            sale_id TEXT REFERENCES sales(id),
            amount REAL NOT NULL,
            quantity INTEGER NOT NULL,
            bucket TEXT NOT NULL CHECK (bucket IN ('WEBSITE', 'EBOOK', 'ECOMMERCE')),
            period TEXT NOT NULL,
            is_paid INTEGER NOT NULL DEFAULT 0,
            paid_at TIMESTAMP,
            payment_ref TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_royalties_author ON royalties(author_id, is_paid)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_royalties_book ON royalties(book_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the notifications table
pub async fn create_notifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            kind TEXT NOT NULL,
            message TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, is_read)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the leads table
pub async fn create_leads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            status TEXT NOT NULL DEFAULT 'NEW',
            assigned_to TEXT REFERENCES users(id),
            contract_amount REAL,
            deadline TIMESTAMP,
            deadline_severity TEXT,
            converted_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the lead_notes table
pub async fn create_lead_notes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lead_notes (
            id TEXT PRIMARY KEY,
            lead_id TEXT NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
            body TEXT NOT NULL,
            created_by TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the lead_stage_history table
pub async fn create_lead_stage_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lead_stage_history (
            id TEXT PRIMARY KEY,
            lead_id TEXT NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
            from_status TEXT NOT NULL,
            to_status TEXT NOT NULL,
            changed_by TEXT NOT NULL,
            changed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_lead_history_lead ON lead_stage_history(lead_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the import_batches table
pub async fn create_import_batches_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batches (
            id TEXT PRIMARY KEY,
            import_type TEXT NOT NULL CHECK (import_type IN ('users', 'books', 'sales')),
            total_rows INTEGER NOT NULL,
            success_count INTEGER NOT NULL DEFAULT 0,
            skipped_count INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            row_detail TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'completed',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            completed_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_database_creates_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("press.db");

        let pool = init_database(&db_path).await.unwrap();
        assert!(db_path.exists());

        // Schema and counter seed are in place
        let counter: i64 =
            sqlx::query_scalar("SELECT value FROM counters WHERE name = 'author_uid'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(counter, 0);
        pool.close().await;

        // Second open against the same file must not error or reseed
        let pool = init_database(&db_path).await.unwrap();
        sqlx::query("UPDATE counters SET value = 7 WHERE name = 'author_uid'")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let pool = init_database(&db_path).await.unwrap();
        let counter: i64 =
            sqlx::query_scalar("SELECT value FROM counters WHERE name = 'author_uid'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(counter, 7);
    }
}
