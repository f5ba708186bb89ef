//! Append-only audit records for every mutating tag operation.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::tag::{TagId, UserId};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum HistoryAction {
    Create,
    Update,
    Delete,
    Move,
    Merge,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Merge => "merge",
        }
    }
}

/// Review state for a history entry. Present for moderation workflows
/// layered on top; the core only ever writes `Pending`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// Client metadata captured alongside a mutation, when the transport layer
/// has it available.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// One audit record. Created once per mutating operation, never updated or
/// deleted afterwards.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct TagHistory {
    pub id: Uuid,
    pub tag_id: TagId,

    pub action: HistoryAction,

    /// Snapshot (full or partial) before the change.
    pub old_data: Option<Json<serde_json::Value>>,
    /// Snapshot (full or partial) after the change.
    pub new_data: Option<Json<serde_json::Value>>,
    /// Changed-field map: `{field: {"old": ..., "new": ...}}`.
    pub diff: Option<Json<serde_json::Value>>,

    pub user_id: UserId,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,

    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_status: ReviewStatus,
    pub review_comment: Option<String>,

    pub created_at: DateTime<Utc>,
}
