//! User CSV import
//!
//! Required fields: `email`, `name`. Optional `role` is case-normalized
//! and constrained to AUTHOR/TEAM/ADMIN, defaulting to AUTHOR. A row
//! whose email already exists is skipped, not erred. Created authors
//! receive a fresh author UID and a unique public slug.

use pressops_common::db::models::UserRole;
use pressops_common::Result;
use serde_json::json;
use sqlx::SqlitePool;

use super::{apply_mapping, field, row_number, ExecutionReport, Mapping, Row, RowIssue, ValidationReport};
use crate::db::users as db;
use crate::services::identity;

pub async fn validate(pool: &SqlitePool, rows: &[Row], mapping: &Mapping) -> Result<ValidationReport> {
    let mut report = ValidationReport {
        valid_count: 0,
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    for (i, raw) in rows.iter().enumerate() {
        let row = apply_mapping(raw, mapping);
        let n = row_number(i);

        let Some(email) = field(&row, "email") else {
            report.errors.push(RowIssue { row: n, message: "Missing email".to_string() });
            continue;
        };
        if field(&row, "name").is_none() {
            report.errors.push(RowIssue { row: n, message: "Missing name".to_string() });
            continue;
        }
        if !identity::is_plausible_email(&email.to_lowercase()) {
            report.errors.push(RowIssue {
                row: n,
                message: format!("Invalid email: '{}'", email),
            });
            continue;
        }
        if db::get_user_by_email(pool, email).await?.is_some() {
            report.warnings.push(RowIssue {
                row: n,
                message: format!("User already exists: {}", email),
            });
            continue;
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

        let (Some(email), Some(name)) = (field(&row, "email"), field(&row, "name")) else {
            report.error_count += 1;
            report.errors.push(RowIssue {
                row: n,
                message: "Missing required field (email, name)".to_string(),
            });
            continue;
        };

        if db::get_user_by_email(pool, email).await?.is_some() {
            report.skipped_count += 1;
            report.skipped.push(RowIssue {
                row: n,
                message: format!("Already exists: {}", email),
            });
            continue;
        }

        let role = UserRole::parse_or_author(field(&row, "role").unwrap_or(""));
        match identity::create_author(pool, email, name, role).await {
            Ok(user) => {
                report.success_count += 1;
                report.success.push(json!({
                    "email": user.email,
                    "author_uid": user.author_uid,
                    "public_slug": user.public_slug,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn new_and_duplicate_rows() {
        let pool = test_pool().await;
        identity::create_author(&pool, "existing@x.com", "Existing", UserRole::Author)
            .await
            .unwrap();

        let rows = vec![
            row(&[("email", "jane@x.com"), ("name", "Jane Doe"), ("role", "AUTHOR")]),
            row(&[("email", "existing@x.com"), ("name", "Someone")]),
        ];

        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.skipped_count, 1);
        assert_eq!(report.error_count, 0);

        assert_eq!(report.success[0]["email"], "jane@x.com");
        let uid = report.success[0]["author_uid"].as_str().unwrap();
        assert!(uid.starts_with("WP"));
        assert_eq!(uid.len(), 7);
        assert!(report.skipped[0].message.contains("Already exists"));
    }

    #[tokio::test]
    async fn unknown_role_defaults_to_author() {
        let pool = test_pool().await;
        let rows = vec![row(&[("email", "r@x.com"), ("name", "R"), ("role", "publisher")])];
        execute(&pool, &rows, &Mapping::new()).await.unwrap();

        let user = db::get_user_by_email(&pool, "r@x.com").await.unwrap().unwrap();
        assert_eq!(user.role, "AUTHOR");
    }

    #[tokio::test]
    async fn validate_reports_row_numbers_with_header_offset() {
        let pool = test_pool().await;
        identity::create_author(&pool, "dup@x.com", "Dup", UserRole::Author)
            .await
            .unwrap();

        let rows = vec![
            row(&[("email", "ok@x.com"), ("name", "Ok")]),
            row(&[("email", "bad-email"), ("name", "Bad")]),
            row(&[("email", "dup@x.com"), ("name", "Dup")]),
            row(&[("name", "No Email")]),
        ];

        let report = validate(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.valid_count, 1);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.errors[0].row, 3);
        assert_eq!(report.warnings[0].row, 4);
        assert_eq!(report.errors[1].row, 5);
    }
}
