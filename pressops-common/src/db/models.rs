//! Shared row models and domain enums
//!
//! Enum-valued columns are stored as TEXT; the enums here own the
//! canonical string forms and the parsing rules (unrecognized role
//! strings fall back to AUTHOR, platform strings map onto a total
//! bucket enumeration with ECOMMERCE as the default case).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Domain enums
// ============================================================================

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Author,
    Admin,
    Team,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Author => "AUTHOR",
            UserRole::Admin => "ADMIN",
            UserRole::Team => "TEAM",
        }
    }

    /// Case-normalized parse; unrecognized values default to AUTHOR.
    pub fn parse_or_author(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" => UserRole::Admin,
            "TEAM" => UserRole::Team,
            _ => UserRole::Author,
        }
    }
}

/// Book catalog status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookStatus {
    Draft,
    InProgress,
    UnderReview,
    Formatting,
    Published,
    OnHold,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Draft => "DRAFT",
            BookStatus::InProgress => "IN_PROGRESS",
            BookStatus::UnderReview => "UNDER_REVIEW",
            BookStatus::Formatting => "FORMATTING",
            BookStatus::Published => "PUBLISHED",
            BookStatus::OnHold => "ON_HOLD",
        }
    }
}

/// Fixed publishing-stage vocabulary, in workflow order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageType {
    ManuscriptReceived,
    InitialReview,
    Editing,
    Proofreading,
    CoverDesign,
    InteriorFormatting,
    FinalReview,
    IsbnAssignment,
    Printing,
    Distribution,
    Completed,
}

/// All stage types in sequence order. New books are seeded with one
/// stage per entry.
pub const STAGE_SEQUENCE: [StageType; 11] = [
    StageType::ManuscriptReceived,
    StageType::InitialReview,
    StageType::Editing,
    StageType::Proofreading,
    StageType::CoverDesign,
    StageType::InteriorFormatting,
    StageType::FinalReview,
    StageType::IsbnAssignment,
    StageType::Printing,
    StageType::Distribution,
    StageType::Completed,
];

impl StageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageType::ManuscriptReceived => "MANUSCRIPT_RECEIVED",
            StageType::InitialReview => "INITIAL_REVIEW",
            StageType::Editing => "EDITING",
            StageType::Proofreading => "PROOFREADING",
            StageType::CoverDesign => "COVER_DESIGN",
            StageType::InteriorFormatting => "INTERIOR_FORMATTING",
            StageType::FinalReview => "FINAL_REVIEW",
            StageType::IsbnAssignment => "ISBN_ASSIGNMENT",
            StageType::Printing => "PRINTING",
            StageType::Distribution => "DISTRIBUTION",
            StageType::Completed => "COMPLETED",
        }
    }

    /// Human-readable label for author-facing views
    pub fn label(&self) -> &'static str {
        match self {
            StageType::ManuscriptReceived => "Manuscript Received",
            StageType::InitialReview => "Initial Review",
            StageType::Editing => "Editing",
            StageType::Proofreading => "Proofreading",
            StageType::CoverDesign => "Cover Design",
            StageType::InteriorFormatting => "Interior Formatting",
            StageType::FinalReview => "Final Review",
            StageType::IsbnAssignment => "ISBN Assignment",
            StageType::Printing => "Printing",
            StageType::Distribution => "Distribution",
            StageType::Completed => "Completed",
        }
    }

    /// 1-based position in the fixed workflow order
    pub fn sequence(&self) -> i64 {
        STAGE_SEQUENCE
            .iter()
            .position(|t| t == self)
            .map(|p| p as i64 + 1)
            .unwrap_or(0)
    }

    pub fn parse(s: &str) -> Option<Self> {
        STAGE_SEQUENCE
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// Publishing-stage workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Pending,
    InProgress,
    AwaitingApproval,
    Approved,
    QueryRaised,
    Completed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "PENDING",
            StageStatus::InProgress => "IN_PROGRESS",
            StageStatus::AwaitingApproval => "AWAITING_APPROVAL",
            StageStatus::Approved => "APPROVED",
            StageStatus::QueryRaised => "QUERY_RAISED",
            StageStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(StageStatus::Pending),
            "IN_PROGRESS" => Some(StageStatus::InProgress),
            "AWAITING_APPROVAL" => Some(StageStatus::AwaitingApproval),
            "APPROVED" => Some(StageStatus::Approved),
            "QUERY_RAISED" => Some(StageStatus::QueryRaised),
            "COMPLETED" => Some(StageStatus::Completed),
            _ => None,
        }
    }

    /// States that represent work being (re)opened. Entering one of
    /// these clears any prior completion timestamp.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            StageStatus::Pending | StageStatus::InProgress | StageStatus::QueryRaised
        )
    }

    /// States that stamp a completion timestamp on entry
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Approved | StageStatus::Completed)
    }
}

/// Coarse royalty category derived from a free-text platform string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoyaltyBucket {
    Website,
    Ebook,
    Ecommerce,
}

impl RoyaltyBucket {
    /// Total mapping from platform string to bucket. ECOMMERCE is the
    /// defined default for anything unrecognized.
    pub fn classify(platform: &str) -> Self {
        let p = platform.to_lowercase();
        if p.contains("website") {
            RoyaltyBucket::Website
        } else if p.contains("ebook") || p.contains("kindle") {
            RoyaltyBucket::Ebook
        } else {
            RoyaltyBucket::Ecommerce
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoyaltyBucket::Website => "WEBSITE",
            RoyaltyBucket::Ebook => "EBOOK",
            RoyaltyBucket::Ecommerce => "ECOMMERCE",
        }
    }
}

/// Standard lead stages. Sites may configure additional custom stages,
/// so lead status is stored as free text; these are the defaults.
pub mod lead_status {
    pub const NEW: &str = "NEW";
    pub const CONTACTED: &str = "CONTACTED";
    pub const INTERESTED: &str = "INTERESTED";
    pub const NEGOTIATING: &str = "NEGOTIATING";
    pub const CONVERTED: &str = "CONVERTED";
    pub const LOST: &str = "LOST";
}

// ============================================================================
// Row models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub author_uid: Option<String>,
    pub public_slug: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author_id: String,
    pub status: String,
    pub isbn_paperback: Option<String>,
    pub isbn_hardcover: Option<String>,
    pub isbn_ebook: Option<String>,
    pub price_paperback: Option<f64>,
    pub price_hardcover: Option<f64>,
    pub price_ebook: Option<f64>,
    pub is_listed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Co-author link with optional royalty-share percentage (0-100).
/// A book with no rows here implicitly grants 100% to its primary author.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookAuthor {
    pub book_id: String,
    pub user_id: String,
    pub share: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublishingStage {
    pub id: String,
    pub book_id: String,
    pub stage_type: String,
    pub sequence_order: i64,
    pub status: String,
    pub is_visible: bool,
    pub is_locked: bool,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub file_link: Option<String>,
    pub notes: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StageHistoryEntry {
    pub id: String,
    pub stage_id: String,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// Per-unit royalty rate for one (book, platform) pair
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookRoyaltyConfig {
    pub id: String,
    pub book_id: String,
    pub platform: String,
    pub royalty_amount: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sale {
    pub id: String,
    pub book_id: String,
    pub platform: String,
    pub quantity: i64,
    pub amount: f64,
    pub sale_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Royalty {
    pub id: String,
    pub author_id: String,
    pub book_id: String,
    pub sale_id: Option<String>,
    pub amount: f64,
    pub quantity: i64,
    pub bucket: String,
    pub period: String,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub assigned_to: Option<String>,
    pub contract_amount: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
    pub deadline_severity: Option<String>,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeadNote {
    pub id: String,
    pub lead_id: String,
    pub body: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeadStageHistory {
    pub id: String,
    pub lead_id: String,
    pub from_status: String,
    pub to_status: String,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// Auditable record of one bulk import run
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImportBatch {
    pub id: String,
    pub import_type: String,
    pub total_rows: i64,
    pub success_count: i64,
    pub skipped_count: i64,
    pub error_count: i64,
    /// JSON array of per-row error/skip detail
    pub row_detail: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_defaults_to_author() {
        assert_eq!(UserRole::parse_or_author("admin"), UserRole::Admin);
        assert_eq!(UserRole::parse_or_author(" Team "), UserRole::Team);
        assert_eq!(UserRole::parse_or_author("publisher"), UserRole::Author);
        assert_eq!(UserRole::parse_or_author(""), UserRole::Author);
    }

    #[test]
    fn stage_sequence_is_fixed_and_ordered() {
        assert_eq!(STAGE_SEQUENCE.len(), 11);
        assert_eq!(StageType::ManuscriptReceived.sequence(), 1);
        assert_eq!(StageType::Completed.sequence(), 11);
        assert_eq!(StageType::parse("cover_design"), Some(StageType::CoverDesign));
        assert_eq!(StageType::parse("nonsense"), None);
    }

    #[test]
    fn bucket_classification_is_total() {
        // Every platform string the system expects to see
        assert_eq!(RoyaltyBucket::classify("Website Store"), RoyaltyBucket::Website);
        assert_eq!(RoyaltyBucket::classify("KINDLE"), RoyaltyBucket::Ebook);
        assert_eq!(RoyaltyBucket::classify("Google eBook"), RoyaltyBucket::Ebook);
        assert_eq!(RoyaltyBucket::classify("AMAZON"), RoyaltyBucket::Ecommerce);
        assert_eq!(RoyaltyBucket::classify("Flipkart"), RoyaltyBucket::Ecommerce);
        assert_eq!(RoyaltyBucket::classify(""), RoyaltyBucket::Ecommerce);
    }

    #[test]
    fn in_flight_states_clear_completion() {
        assert!(StageStatus::Pending.is_in_flight());
        assert!(StageStatus::InProgress.is_in_flight());
        assert!(StageStatus::QueryRaised.is_in_flight());
        assert!(!StageStatus::AwaitingApproval.is_in_flight());
        assert!(StageStatus::Approved.is_terminal());
        assert!(StageStatus::Completed.is_terminal());
    }
}
