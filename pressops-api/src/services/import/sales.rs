//! Sales CSV import
//!
//! Required: `isbn`, `platform`, numeric `amount`. The ISBN is matched
//! against all three of a book's ISBN fields; no match is a row error
//! and the batch continues. Each successful row creates a `Sale` and,
//! when an active royalty config exists for the (book, platform) pair,
//! immediately generates the per-unit royalties for that row.

use chrono::Utc;
use pressops_common::db::models::Sale;
use pressops_common::Result;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{apply_mapping, field, row_number, ExecutionReport, Mapping, Row, RowIssue, ValidationReport};
use crate::db::{books, royalties};
use crate::services::royalty;

pub async fn validate(pool: &SqlitePool, rows: &[Row], mapping: &Mapping) -> Result<ValidationReport> {
    let mut report = ValidationReport {
        valid_count: 0,
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    for (i, raw) in rows.iter().enumerate() {
        let row = apply_mapping(raw, mapping);
        let n = row_number(i);

        let Some(isbn) = field(&row, "isbn") else {
            report.errors.push(RowIssue { row: n, message: "Missing isbn".to_string() });
            continue;
        };
        if field(&row, "platform").is_none() {
            report.errors.push(RowIssue { row: n, message: "Missing platform".to_string() });
            continue;
        }
        match field(&row, "amount") {
            None => {
                report.errors.push(RowIssue { row: n, message: "Missing amount".to_string() });
                continue;
            }
            Some(a) if a.parse::<f64>().is_err() => {
                report.errors.push(RowIssue {
                    row: n,
                    message: format!("Invalid amount: '{}'", a),
                });
                continue;
            }
            Some(_) => {}
        }
        if books::find_book_by_any_isbn(pool, isbn).await?.is_none() {
            report.errors.push(RowIssue {
                row: n,
                message: format!("No book matches ISBN '{}'", isbn),
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

        let (Some(isbn), Some(platform)) = (field(&row, "isbn"), field(&row, "platform")) else {
            report.error_count += 1;
            report.errors.push(RowIssue {
                row: n,
                message: "Missing required field (isbn, platform)".to_string(),
            });
            continue;
        };
        let amount: f64 = match field(&row, "amount").map(str::parse) {
            Some(Ok(a)) => a,
            _ => {
                report.error_count += 1;
                report.errors.push(RowIssue {
                    row: n,
                    message: "Missing or non-numeric amount".to_string(),
                });
                continue;
            }
        };
        let quantity: i64 = match field(&row, "quantity") {
            None => 1,
            Some(q) => match q.parse() {
                Ok(q) if q > 0 => q,
                _ => {
                    report.error_count += 1;
                    report.errors.push(RowIssue {
                        row: n,
                        message: format!("Invalid quantity: '{}'", q),
                    });
                    continue;
                }
            },
        };

        let Some(book) = books::find_book_by_any_isbn(pool, isbn).await? else {
            report.error_count += 1;
            report.errors.push(RowIssue {
                row: n,
                message: format!("No book matches ISBN '{}'", isbn),
            });
            continue;
        };

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            book_id: book.id.clone(),
            platform: platform.to_string(),
            quantity,
            amount,
            sale_date: None,
            created_at: Utc::now(),
        };
        royalties::insert_sale(pool, &sale).await?;

        // Royalties only when a usable config exists; its absence is
        // not a row error for sales import. A generation failure (bad
        // co-author shares) is a row error, but the sale itself stands
        // and the batch continues.
        let mut generated = 0;
        let has_config = royalties::get_active_config(pool, &book.id, platform)
            .await?
            .map(|c| c.royalty_amount > 0.0)
            .unwrap_or(false);
        if has_config {
            let period = field(&row, "period").map(str::to_string);
            match royalty::generate_royalty(pool, &book.id, platform, quantity, period, Some(&sale.id))
                .await
            {
                Ok(out) => {
                    generated = out.royalties.len();
                    report.royalties_generated += generated;
                }
                Err(e) => {
                    report.error_count += 1;
                    report.errors.push(RowIssue { row: n, message: e.to_string() });
                    continue;
                }
            }
        }

        report.success_count += 1;
        report.success.push(json!({
            "sale_id": sale.id,
            "book_id": book.id,
            "isbn": isbn,
            "royalties_generated": generated,
        }));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use crate::services::identity;
    use pressops_common::db::models::{Book, BookStatus, UserRole};

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    async fn book_with_isbns(pool: &SqlitePool) -> String {
        let author = identity::create_author(pool, "sales@x.com", "S", UserRole::Author)
            .await
            .unwrap();
        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4().to_string(),
            title: "Sold Book".to_string(),
            author_id: author.id,
            status: BookStatus::Published.as_str().to_string(),
            isbn_paperback: Some("978-PB".to_string()),
            isbn_hardcover: Some("978-HC".to_string()),
            isbn_ebook: Some("978-EB".to_string()),
            price_paperback: None,
            price_hardcover: None,
            price_ebook: None,
            is_listed: true,
            created_at: now,
            updated_at: now,
        };
        books::insert_book(pool, &book).await.unwrap();
        book.id
    }

    #[tokio::test]
    async fn matches_any_of_the_three_isbn_fields() {
        let pool = test_pool().await;
        book_with_isbns(&pool).await;

        let rows = vec![
            row(&[("isbn", "978-PB"), ("platform", "AMAZON"), ("amount", "100")]),
            row(&[("isbn", "978-HC"), ("platform", "AMAZON"), ("amount", "150")]),
            row(&[("isbn", "978-EB"), ("platform", "KINDLE"), ("amount", "80")]),
        ];
        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.success_count, 3);
        assert_eq!(report.error_count, 0);
    }

    #[tokio::test]
    async fn unknown_isbn_is_an_error_outcome_and_batch_continues() {
        let pool = test_pool().await;
        book_with_isbns(&pool).await;

        let rows = vec![
            row(&[("isbn", "no-such-isbn"), ("platform", "AMAZON"), ("amount", "10")]),
            row(&[("isbn", "978-PB"), ("platform", "AMAZON"), ("amount", "20")]),
        ];
        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.error_count, 1);
        assert_eq!(report.success_count, 1);
        assert!(report.errors[0].message.contains("no-such-isbn"));
    }

    #[tokio::test]
    async fn generates_royalties_only_when_config_exists() {
        let pool = test_pool().await;
        let book_id = book_with_isbns(&pool).await;

        let rows = vec![row(&[
            ("isbn", "978-PB"),
            ("platform", "AMAZON"),
            ("amount", "500"),
            ("quantity", "5"),
        ])];
        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.royalties_generated, 0);

        royalties::upsert_config(&pool, &book_id, "AMAZON", 42.0).await.unwrap();
        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.royalties_generated, 1);
    }

    #[tokio::test]
    async fn royalty_failure_is_a_row_error_not_a_batch_error() {
        let pool = test_pool().await;
        let book_id = book_with_isbns(&pool).await;
        let co = identity::create_author(&pool, "co@x.com", "Co", UserRole::Author)
            .await
            .unwrap();

        // Shares resolve to 80%: royalty generation refuses the split
        let primary: String = sqlx::query_scalar("SELECT author_id FROM books WHERE id = ?")
            .bind(&book_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        books::add_co_author(&pool, &book_id, &primary, Some(60.0)).await.unwrap();
        books::add_co_author(&pool, &book_id, &co.id, Some(20.0)).await.unwrap();
        royalties::upsert_config(&pool, &book_id, "AMAZON", 42.0).await.unwrap();

        let rows = vec![row(&[("isbn", "978-PB"), ("platform", "AMAZON"), ("amount", "210")])];
        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.error_count, 1);
        assert_eq!(report.royalties_generated, 0);
        assert!(report.errors[0].message.contains("must total 100%"));
    }

    #[tokio::test]
    async fn non_numeric_amount_is_a_row_error() {
        let pool = test_pool().await;
        book_with_isbns(&pool).await;

        let rows = vec![row(&[("isbn", "978-PB"), ("platform", "AMAZON"), ("amount", "abc")])];
        let report = validate(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("Invalid amount"));

        let report = execute(&pool, &rows, &Mapping::new()).await.unwrap();
        assert_eq!(report.error_count, 1);
        assert_eq!(report.success_count, 0);
    }
}
