//! Durable, append-only audit log for tag mutations.

use chrono::Utc;
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    error::DatabaseError,
    models::{
        history::{ClientMeta, HistoryAction, ReviewStatus, TagHistory},
        tag::{TagId, UserId},
    },
    store::TagStore,
};

/// Records one history row per mutating operation.
///
/// History is best-effort observability, not a transactional participant:
/// when a write fails we log it and let the structural mutation stand.
#[derive(Clone, Debug)]
pub struct HistoryRecorder {
    store: TagStore,
}

impl HistoryRecorder {
    pub fn new(store: TagStore) -> Self {
        Self { store }
    }

    /// Appends an audit record. Never fails the enclosing operation.
    pub async fn record(
        &self,
        tag_id: TagId,
        action: HistoryAction,
        actor_id: UserId,
        old_data: Option<Value>,
        new_data: Option<Value>,
        client: Option<ClientMeta>,
    ) {
        if let Err(e) = self
            .try_record(tag_id, action, actor_id, old_data, new_data, client)
            .await
        {
            tracing::error!(
                "failed to record `{}` history for tag `{tag_id}`! the mutation itself stands. err: {e}",
                action.as_str()
            );
        }
    }

    async fn try_record(
        &self,
        tag_id: TagId,
        action: HistoryAction,
        actor_id: UserId,
        old_data: Option<Value>,
        new_data: Option<Value>,
        client: Option<ClientMeta>,
    ) -> Result<(), DatabaseError> {
        let diff = match (&old_data, &new_data) {
            (Some(old), Some(new)) => Some(Self::diff(old, new)),
            _ => None,
        };

        let client = client.unwrap_or_default();

        let row = TagHistory {
            id: Uuid::new_v4(),
            tag_id,
            action,
            old_data: old_data.map(Json),
            new_data: new_data.map(Json),
            diff: diff.map(Json),
            user_id: actor_id,
            user_agent: client.user_agent,
            ip_address: client.ip_address,
            reviewed_by: None,
            reviewed_at: None,
            review_status: ReviewStatus::Pending,
            review_comment: None,
            created_at: Utc::now(),
        };

        self.store.upsert(&row).await
    }

    /// History for one tag, most recent first.
    pub async fn for_tag(
        &self,
        tag_id: TagId,
        limit: u64,
    ) -> Result<Vec<TagHistory>, DatabaseError> {
        self.store.history_for(tag_id, limit).await
    }

    /// Changed-field map between two snapshots: every key present in either
    /// object whose values differ, as `{key: {"old": ..., "new": ...}}`.
    /// A key missing from one side diffs against `null`.
    pub(crate) fn diff(old: &Value, new: &Value) -> Value {
        let empty = serde_json::Map::new();
        let old_map = old.as_object().unwrap_or(&empty);
        let new_map = new.as_object().unwrap_or(&empty);

        let mut keys: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
        keys.sort();
        keys.dedup();

        let mut out = serde_json::Map::new();
        for key in keys {
            let old_val = old_map.get(key).cloned().unwrap_or(Value::Null);
            let new_val = new_map.get(key).cloned().unwrap_or(Value::Null);

            if old_val != new_val {
                out.insert(
                    key.clone(),
                    serde_json::json!({ "old": old_val, "new": new_val }),
                );
            }
        }

        Value::Object(out)
    }
}
