//! Book database operations

use pressops_common::db::models::{Book, BookAuthor};
use pressops_common::Result;
use sqlx::SqlitePool;

pub async fn insert_book(pool: &SqlitePool, book: &Book) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO books (
            id, title, author_id, status,
            isbn_paperback, isbn_hardcover, isbn_ebook,
            price_paperback, price_hardcover, price_ebook,
            is_listed, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&book.id)
    .bind(&book.title)
    .bind(&book.author_id)
    .bind(&book.status)
    .bind(&book.isbn_paperback)
    .bind(&book.isbn_hardcover)
    .bind(&book.isbn_ebook)
    .bind(book.price_paperback)
    .bind(book.price_hardcover)
    .bind(book.price_ebook)
    .bind(book.is_listed)
    .bind(book.created_at)
    .bind(book.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_book(pool: &SqlitePool, id: &str) -> Result<Option<Book>> {
    let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(book)
}

/// Paperback-ISBN collision check for imports
pub async fn paperback_isbn_exists(pool: &SqlitePool, isbn: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn_paperback = ?)")
            .bind(isbn)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Match a sales-row ISBN against any of a book's three ISBN fields
pub async fn find_book_by_any_isbn(pool: &SqlitePool, isbn: &str) -> Result<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(
        r#"
        SELECT * FROM books
        WHERE isbn_paperback = ?1 OR isbn_hardcover = ?1 OR isbn_ebook = ?1
        LIMIT 1
        "#,
    )
    .bind(isbn)
    .fetch_optional(pool)
    .await?;
    Ok(book)
}

/// Explicit co-author share rows. Empty means the primary author
/// implicitly holds 100%.
pub async fn get_co_authors(pool: &SqlitePool, book_id: &str) -> Result<Vec<BookAuthor>> {
    let authors = sqlx::query_as::<_, BookAuthor>(
        "SELECT book_id, user_id, share FROM book_authors WHERE book_id = ?",
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?;
    Ok(authors)
}

pub async fn add_co_author(
    pool: &SqlitePool,
    book_id: &str,
    user_id: &str,
    share: Option<f64>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO book_authors (book_id, user_id, share) VALUES (?, ?, ?)
        ON CONFLICT(book_id, user_id) DO UPDATE SET share = excluded.share
        "#,
    )
    .bind(book_id)
    .bind(user_id)
    .bind(share)
    .execute(pool)
    .await?;
    Ok(())
}
