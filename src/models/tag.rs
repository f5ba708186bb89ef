//! The tag entity itself - a named node in the taxonomy.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

pub type TagId = Uuid;
pub type UserId = Uuid;

/// Free-form key-value bag attached to a tag.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Key inside [`Tag::properties`] that a merged tag uses to point at the
/// tag it was folded into.
pub const MERGED_TO_KEY: &str = "merged_to";

/// Lifecycle status of a tag.
///
/// `Merged` and `Deleted` are terminal - nothing transitions out of them.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TagStatus {
    Active,
    Deprecated,
    Merged,
    Deleted,
}

impl TagStatus {
    /// The status state machine:
    /// `active -> {deprecated, merged, deleted}`,
    /// `deprecated -> {active, merged, deleted}`.
    pub fn can_transition_to(self, next: TagStatus) -> bool {
        match self {
            Self::Active => matches!(next, Self::Deprecated | Self::Merged | Self::Deleted),
            Self::Deprecated => matches!(next, Self::Active | Self::Merged | Self::Deleted),
            Self::Merged | Self::Deleted => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Merged | Self::Deleted)
    }

    /// The status as it's stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deprecated => "deprecated",
            Self::Merged => "merged",
            Self::Deleted => "deleted",
        }
    }
}

impl core::fmt::Display for TagStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tag in the taxonomy.
///
/// The parent pointer is the source of truth for the hierarchy. `level` and
/// `path` are derived caches kept consistent by the hierarchy engine - never
/// hand-edit them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// A unique identifier. Always use this when referencing the tag
    /// externally - names can be merged away, ids are forever.
    pub id: TagId,

    /// The primary name. Unique among *active* tags only.
    pub name: String,

    /// Optional alternate-language name.
    pub name_alt: Option<String>,

    pub description: String,

    /// Optional alternate-language description.
    pub description_alt: Option<String>,

    /// The owning parent, if any. `None` means this is a root tag.
    pub parent_id: Option<TagId>,

    /// Distance from the nearest root ancestor. Roots sit at 0.
    pub level: i64,

    /// Materialized slash-joined name chain, e.g. `Everything/Animal/Cat`.
    pub path: String,

    /// Coarse classification (biological, physical, artificial, ...).
    pub category: String,

    /// Finer-grained subject area.
    pub domain: String,

    /// Concept rather than concrete thing.
    pub is_abstract: bool,

    /// Created by the system (seeding) rather than a user. Protected.
    pub is_system: bool,

    pub status: TagStatus,

    /// Editorial quality signal, 0-10.
    pub quality_score: f64,

    /// How many content items reference this tag.
    pub usage_count: i64,

    /// Derived from `usage_count`.
    pub popularity_score: f64,

    /// Synonym strings.
    pub aliases: Json<Vec<String>>,

    /// Non-hierarchical cross-links to other tags.
    pub related_tags: Json<Vec<TagId>>,

    /// External reference URLs.
    pub external_links: Json<Vec<String>>,

    pub properties: Json<Properties>,

    pub applicable_content_types: Json<Vec<String>>,

    pub created_by: UserId,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    pub fn is_active(&self) -> bool {
        self.status == TagStatus::Active
    }

    /// Where a merged tag went. `None` unless `status == Merged`.
    pub fn merged_to(&self) -> Option<TagId> {
        self.properties
            .get(MERGED_TO_KEY)
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Full JSON snapshot for history payloads.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Popularity derived from usage. Mirrored on every usage update.
    pub fn popularity_for(usage_count: i64) -> f64 {
        usage_count as f64 * 0.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_state_machine() {
        use TagStatus::*;

        assert!(Active.can_transition_to(Deprecated));
        assert!(Active.can_transition_to(Merged));
        assert!(Active.can_transition_to(Deleted));
        assert!(Deprecated.can_transition_to(Active));
        assert!(Deprecated.can_transition_to(Deleted));

        // terminal states stay terminal
        for next in [Active, Deprecated, Merged, Deleted] {
            assert!(!Merged.can_transition_to(next));
            assert!(!Deleted.can_transition_to(next));
        }

        // no self-loops
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn merged_to_reads_properties() {
        let target = Uuid::new_v4();
        let mut props = Properties::new();
        props.insert(
            MERGED_TO_KEY.into(),
            serde_json::Value::String(target.to_string()),
        );

        let tag = Tag {
            id: Uuid::new_v4(),
            name: "old".into(),
            name_alt: None,
            description: String::new(),
            description_alt: None,
            parent_id: None,
            level: 0,
            path: "old".into(),
            category: "general".into(),
            domain: "general".into(),
            is_abstract: false,
            is_system: false,
            status: TagStatus::Merged,
            quality_score: 5.0,
            usage_count: 0,
            popularity_score: 0.0,
            aliases: Json(vec![]),
            related_tags: Json(vec![]),
            external_links: Json(vec![]),
            properties: Json(props),
            applicable_content_types: Json(vec![]),
            created_by: Uuid::new_v4(),
            approved_by: None,
            approved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(tag.merged_to(), Some(target));
    }
}
