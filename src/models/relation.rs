//! Typed, non-hierarchical edges between tags.
//!
//! Distinct from parent/child containment - relations feed recommendation
//! signals only and carry no structural weight.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::tag::{Properties, TagId, UserId};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RelationType {
    Synonym,
    Antonym,
    Related,
    PartOf,
    InstanceOf,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RelationStatus {
    Active,
    Inactive,
    Pending,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct TagRelation {
    pub id: Uuid,

    pub from_tag_id: TagId,
    pub to_tag_id: TagId,

    pub relation_type: RelationType,

    /// Relation strength, 0-1.
    pub strength: f64,

    /// Whether the edge reads the same from both ends.
    pub is_bidirectional: bool,

    pub description: Option<String>,
    pub properties: Json<Properties>,

    pub created_by: UserId,
    pub approved_by: Option<UserId>,
    pub status: RelationStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TagRelation {
    /// A fresh active relation between two tags.
    pub fn new(
        from_tag_id: TagId,
        to_tag_id: TagId,
        relation_type: RelationType,
        created_by: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            from_tag_id,
            to_tag_id,
            relation_type,
            strength: 1.0,
            is_bidirectional: true,
            description: None,
            properties: Json(Properties::new()),
            created_by,
            approved_by: None,
            status: RelationStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}
