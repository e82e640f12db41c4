//! Book CSV import
//!
//! Required: `title` plus an author reference. `author_uid` is tried
//! first; an `author_email` reference falls back to creating a
//! placeholder author when no user matches (with `author_name` or the
//! email's local part as display name). A paperback-ISBN collision
//! skips the row. Created books are seeded with the full fixed stage
//! sequence.

use chrono::Utc;
use pressops_common::db::models::{Book, BookStatus, User};
use pressops_common::Result;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{apply_mapping, field, row_number, ExecutionReport, Mapping, Row, RowIssue, ValidationReport};
use crate::db::{books as db, users};
use crate::services::{identity, stages};

pub async fn validate(pool: &SqlitePool, rows: &[Row], mapping: &Mapping) -> Result<ValidationReport> {
    let mut report = ValidationReport {
        valid_count: 0,
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    for (i, raw) in rows.iter().enumerate() {
        let row = apply_mapping(raw, mapping);
        let n = row_number(i);

        if field(&row, "title").is_none() {
            report.errors.push(RowIssue { row: n, message: "Missing title".to_string() });
            continue;
        }
        match author_reference(&row) {
            AuthorRef::None => {
                report.errors.push(RowIssue {
                    row: n,
                    message: "Missing author reference (author_uid or author_email)".to_string(),
                });
                continue;
            }
            AuthorRef::Uid(uid) => {
                if users::get_user_by_author_uid(pool, uid).await?.is_none() {
                    report.errors.push(RowIssue {
                        row: n,
                        message: format!("No author with UID '{}'", uid),
                    });
                    continue;
                }
            }
            // Email references always resolve: a placeholder author is
            // created on execute if needed.
            AuthorRef::Email(_) => {}
        }
        if let Some(isbn) = field(&row, "isbn_paperback") {
            if db::paperback_isbn_exists(pool, isbn).await? {
                report.warnings.push(RowIssue {
                    row: n,
                    message: format!("ISBN already exists: {} (row will be skipped)", isbn),
                });
                continue;
            }
        }
        report.valid_count += 1;
    }

    Ok(report)
}

pub async fn execute(pool: &SqlitePool, rows: &[Row], mapping: &Mapping) -> Result<ExecutionReport> {
    let mut report = ExecutionReport {
        batch_id: String::new(),
        success_count: 0,
        skipped_count: 0,
        error_count: 0,
        success: Vec::new(),
        skipped: Vec::new(),
        errors: Vec::new(),
        royalties_generated: 0,
    };

    for (i, raw) in rows.iter().enumerate() {
        let row = apply_mapping(raw, mapping);
        let n = row_number(i);

        let Some(title) = field(&row, "title") else {
            report.error_count += 1;
            report.errors.push(RowIssue { row: n, message: "Missing title".to_string() });
            continue;
        };

        let author = match resolve_author(pool, &row).await {
            Ok(Some(author)) => author,
            Ok(None) => {
                report.error_count += 1;
                report.errors.push(RowIssue {
                    row: n,
                    message: "No author resolved (author_uid or author_email required)".to_string(),
                });
                continue;
            }
            Err(e) => {
                report.error_count += 1;
                report.errors.push(RowIssue { row: n, message: e.to_string() });
                continue;
            }
        };

        let isbn_paperback = field(&row, "isbn_paperback");
        if let Some(isbn) = isbn_paperback {
            if db::paperback_isbn_exists(pool, isbn).await? {
                report.skipped_count += 1;
                report.skipped.push(RowIssue {
                    row: n,
                    message: format!("ISBN already exists: {}", isbn),
                });
                continue;
            }
        }

        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            author_id: author.id.clone(),
            status: BookStatus::Draft.as_str().to_string(),
            isbn_paperback: isbn_paperback.map(str::to_string),
            isbn_hardcover: field(&row, "isbn_hardcover").map(str::to_string),
            isbn_ebook: field(&row, "isbn_ebook").map(str::to_string),
            price_paperback: parse_price(&row, "price_paperback"),
            price_hardcover: parse_price(&row, "price_hardcover"),
            price_ebook: parse_price(&row, "price_ebook"),
            is_listed: true,
            created_at: now,
            updated_at: now,
        };

        match db::insert_book(pool, &book).await {
            Ok(()) => {
                stages::seed_stages(pool, &book.id).await?;
                report.success_count += 1;
                report.success.push(json!({
                    "id": book.id,
                    "title": book.title,
                    "author_uid": author.author_uid,
                }));
            }
            Err(e) => {
                report.error_count += 1;
                report.errors.push(RowIssue { row: n, message: e.to_string() });
            }
        }
    }

    Ok(report)
}

enum AuthorRef<'a> {
    Uid(&'a str),
    Email(&'a str),
    None,
}

/// UID reference takes precedence over email.
fn author_reference<'a>(row: &'a Row) -> AuthorRef<'a> {
    if let Some(uid) = field(row, "author_uid") {
        AuthorRef::Uid(uid)
    } else if let Some(email) = field(row, "author_email") {
        AuthorRef::Email(email)
    } else {
        AuthorRef::None
    }
}

async fn resolve_author(pool: &SqlitePool, row: &Row) -> Result<Option<User>> {
    match author_reference(row) {
        AuthorRef::Uid(uid) => Ok(users::get_user_by_author_uid(pool, uid).await?),
        AuthorRef::Email(email) => {
            let name = field(row, "author_name")
                .map(str::to_string)
                .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());
            let user = identity::get_or_create_author_by_email(pool, email, &name).await?;
            Ok(Some(user))
        }
        AuthorRef::None => Ok(None),
    }
}

fn parse_price(row: &Row, name: &str) -> Option<f64> {
    field(row, name).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use pressops_common::db::models::UserRole;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn resolves_author_by_uid_before_email() {
        let pool = test_pool().await;
        let author = identity::create_author(&pool, "a@x.com", "A", UserRole::Author)
            .await
            .unwrap();
        let uid = author.author_uid.clone().unwrap();

        let rows = vec![row(&[
            ("title", "By UID"),
            ("author_uid", uid.as_str()),
            ("author_email", "someoneelse@x.com"),
        ])];
        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.success[0]["author_uid"], uid.as_str());
    }

    #[tokio::test]
    async fn email_reference_creates_placeholder_author() {
        let pool = test_pool().await;
        let rows = vec![row(&[("title", "New Book"), ("author_email", "ghost@x.com")])];

        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.success_count, 1);

        let created = users::get_user_by_email(&pool, "ghost@x.com").await.unwrap().unwrap();
        assert_eq!(created.role, "AUTHOR");
        assert!(created.author_uid.is_some());
        assert_eq!(created.name, "ghost");
    }

    #[tokio::test]
    async fn unknown_uid_is_a_row_error_not_a_batch_error() {
        let pool = test_pool().await;
        let rows = vec![
            row(&[("title", "Bad Ref"), ("author_uid", "WP99999")]),
            row(&[("title", "Good"), ("author_email", "ok@x.com")]),
        ];

        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.error_count, 1);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.errors[0].row, 2);
    }

    #[tokio::test]
    async fn isbn_collision_skips_row() {
        let pool = test_pool().await;
        let rows = vec![row(&[
            ("title", "First"),
            ("author_email", "a@x.com"),
            ("isbn_paperback", "978-1-0000-0001-1"),
        ])];
        execute(&pool, &rows, &Mapping::new()).await.unwrap();

        let rows = vec![row(&[
            ("title", "Second"),
            ("author_email", "a@x.com"),
            ("isbn_paperback", "978-1-0000-0001-1"),
        ])];
        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.skipped_count, 1);
        assert_eq!(report.success_count, 0);
    }

    #[tokio::test]
    async fn created_books_are_seeded_with_all_stages() {
        let pool = test_pool().await;
        let rows = vec![row(&[("title", "Staged"), ("author_email", "s@x.com")])];
        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();

        let book_id = report.success[0]["id"].as_str().unwrap();
        let stage_rows = crate::db::stages::list_stages(&pool, book_id, false).await.unwrap();
        assert_eq!(stage_rows.len(), 11);
        assert!(stage_rows.iter().all(|s| s.status == "PENDING"));
    }
}
