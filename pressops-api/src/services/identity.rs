//! Identity resolution and author-UID generation
//!
//! Maps loose identifiers (internal id, author UID, email) onto exactly
//! one user, and owns the `WP#####` sequence. The sequence bump is a
//! single atomic UPDATE; duplicate UIDs under concurrent creation are
//! not possible.

use chrono::Utc;
use pressops_common::db::models::{User, UserRole};
use pressops_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::users;

/// Resolve a loose identifier to exactly one user.
///
/// Priority order: internal id, then author UID, then case-insensitive
/// email. Returns the first match.
pub async fn resolve_author(pool: &SqlitePool, identifier: &str) -> Result<User> {
    if let Some(user) = users::get_user_by_id(pool, identifier).await? {
        return Ok(user);
    }
    if let Some(user) = users::get_user_by_author_uid(pool, identifier).await? {
        return Ok(user);
    }
    if let Some(user) = users::get_user_by_email(pool, identifier).await? {
        return Ok(user);
    }
    Err(Error::NotFound(format!(
        "No user matched '{}' (tried internal id, author UID, email)",
        identifier
    )))
}

/// Generate the next author UID (`WP` + zero-padded sequence number).
///
/// The counter bump and read happen in one statement so concurrent
/// callers always receive distinct values.
pub async fn generate_author_uid(pool: &SqlitePool) -> Result<String> {
    let next: i64 = sqlx::query_scalar(
        "UPDATE counters SET value = value + 1 WHERE name = 'author_uid' RETURNING value",
    )
    .fetch_one(pool)
    .await?;

    Ok(format!("WP{:05}", next))
}

/// Idempotent: returns the user's existing UID, or generates and
/// persists a fresh one.
pub async fn ensure_author_uid(pool: &SqlitePool, user: &User) -> Result<String> {
    if let Some(uid) = &user.author_uid {
        return Ok(uid.clone());
    }
    let uid = generate_author_uid(pool).await?;
    users::set_author_uid(pool, &user.id, &uid).await?;
    Ok(uid)
}

/// Existing AUTHOR by email, or a freshly created one with a new UID
/// and a unique public slug.
pub async fn get_or_create_author_by_email(
    pool: &SqlitePool,
    email: &str,
    name: &str,
) -> Result<User> {
    if let Some(user) = users::get_user_by_email(pool, email).await? {
        return Ok(user);
    }
    create_author(pool, email, name, UserRole::Author).await
}

/// Create a user with a generated author UID and unique public slug.
pub async fn create_author(
    pool: &SqlitePool,
    email: &str,
    name: &str,
    role: UserRole,
) -> Result<User> {
    let email = email.trim().to_lowercase();
    if !is_plausible_email(&email) {
        return Err(Error::Validation(format!("Invalid email: '{}'", email)));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Name is required".to_string()));
    }

    let uid = generate_author_uid(pool).await?;
    let slug = unique_slug(pool, name).await?;
    let now = Utc::now();

    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        name: name.to_string(),
        role: role.as_str().to_string(),
        author_uid: Some(uid),
        public_slug: Some(slug),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    users::insert_user(pool, &user).await?;

    tracing::info!(user_id = %user.id, author_uid = ?user.author_uid, "Created author");
    Ok(user)
}

/// Slugify a display name and append a numeric suffix on collision.
pub async fn unique_slug(pool: &SqlitePool, name: &str) -> Result<String> {
    let base = slugify(name);
    let base = if base.is_empty() { "author".to_string() } else { base };

    if !users::slug_exists(pool, &base).await? {
        return Ok(base);
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !users::slug_exists(pool, &candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Lowercase, alphanumerics kept, runs of anything else collapsed to
/// single hyphens.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Minimal shape check; real deliverability is out of scope.
pub fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Jane Doe"), "jane-doe");
        assert_eq!(slugify("  A.  B.  O'Neil "), "a-b-o-neil");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn email_shape_check() {
        assert!(is_plausible_email("jane@x.com"));
        assert!(!is_plausible_email("jane"));
        assert!(!is_plausible_email("@x.com"));
        assert!(!is_plausible_email("jane@nodot"));
    }

    #[tokio::test]
    async fn author_uid_sequence_is_distinct_and_monotonic() {
        let pool = test_pool().await;

        let mut uids = Vec::new();
        for _ in 0..10 {
            uids.push(generate_author_uid(&pool).await.unwrap());
        }

        assert_eq!(uids[0], "WP00001");
        assert_eq!(uids[9], "WP00010");
        let mut deduped = uids.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), 10);
    }

    #[tokio::test]
    async fn concurrent_uid_generation_yields_no_duplicates() {
        let pool = test_pool().await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            handles.push(tokio::spawn(
                async move { generate_author_uid(&pool).await },
            ));
        }

        let mut uids = Vec::new();
        for handle in handles {
            uids.push(handle.await.unwrap().unwrap());
        }
        uids.sort();
        uids.dedup();
        assert_eq!(uids.len(), 8);
    }

    #[tokio::test]
    async fn resolve_author_tries_id_uid_then_email() {
        let pool = test_pool().await;
        let user = create_author(&pool, "Jane@X.com", "Jane Doe", UserRole::Author)
            .await
            .unwrap();

        // Email is stored lowercased
        assert_eq!(user.email, "jane@x.com");

        let by_id = resolve_author(&pool, &user.id).await.unwrap();
        assert_eq!(by_id.id, user.id);

        let by_uid = resolve_author(&pool, user.author_uid.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(by_uid.id, user.id);

        let by_email = resolve_author(&pool, "JANE@x.COM").await.unwrap();
        assert_eq!(by_email.id, user.id);

        let err = resolve_author(&pool, "nobody@x.com").await.unwrap_err();
        assert!(err.to_string().contains("tried internal id, author UID, email"));
    }

    #[tokio::test]
    async fn ensure_author_uid_is_idempotent() {
        let pool = test_pool().await;
        let user = create_author(&pool, "a@x.com", "A", UserRole::Author)
            .await
            .unwrap();

        let existing = user.author_uid.clone().unwrap();
        let ensured = ensure_author_uid(&pool, &user).await.unwrap();
        assert_eq!(ensured, existing);
    }

    #[tokio::test]
    async fn slug_collision_appends_suffix() {
        let pool = test_pool().await;
        let first = create_author(&pool, "a@x.com", "Jane Doe", UserRole::Author)
            .await
            .unwrap();
        let second = create_author(&pool, "b@x.com", "Jane Doe", UserRole::Author)
            .await
            .unwrap();

        assert_eq!(first.public_slug.as_deref(), Some("jane-doe"));
        assert_eq!(second.public_slug.as_deref(), Some("jane-doe-2"));
    }
}
