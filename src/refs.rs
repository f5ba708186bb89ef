//! The content-reference collaborator.
//!
//! The taxonomy core doesn't own content taggings - it only asks "how many
//! entries reference this tag" and, during a merge, "repoint them". The
//! trait keeps that seam explicit; [`EntryTaggings`] is the stock
//! implementation over the `entry_tags` table for deployments that keep
//! taggings in the same store.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{database::Db, error::DatabaseError, models::tag::TagId};

#[async_trait]
pub trait ContentRefs: Send + Sync {
    /// Whether `count` reflects the real reference store. Implementations
    /// that can't answer (like [`NoContentRefs`]) return `false` so callers
    /// don't overwrite cached usage counts with zeros.
    fn is_authoritative(&self) -> bool {
        true
    }

    /// How many content items currently reference this tag.
    async fn count(&self, tag_id: TagId) -> Result<i64, DatabaseError>;

    /// Repoints every reference from one tag to another, returning how many
    /// rows moved.
    async fn rewrite(&self, from: TagId, to: TagId) -> Result<u64, DatabaseError>;
}

/// Content references held in the local `entry_tags` table.
#[derive(Clone, Debug)]
pub struct EntryTaggings {
    pool: Db,
}

impl EntryTaggings {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }

    /// Tags an entry. Idempotent per (entry, tag) pair.
    pub async fn add(&self, entry_id: Uuid, tag_id: TagId) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT OR IGNORE INTO entry_tags (entry_id, tag_id, created_at) VALUES ($1, $2, $3)",
        )
        .bind(entry_id)
        .bind(tag_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove(&self, entry_id: Uuid, tag_id: TagId) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM entry_tags WHERE entry_id = $1 AND tag_id = $2")
            .bind(entry_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ContentRefs for EntryTaggings {
    async fn count(&self, tag_id: TagId) -> Result<i64, DatabaseError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM entry_tags WHERE tag_id = $1")
            .bind(tag_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn rewrite(&self, from: TagId, to: TagId) -> Result<u64, DatabaseError> {
        // entries that already carry the target keep their existing row;
        // `OR IGNORE` skips those, and the cleanup delete drops the leftovers
        let moved = sqlx::query("UPDATE OR IGNORE entry_tags SET tag_id = $2 WHERE tag_id = $1")
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM entry_tags WHERE tag_id = $1")
            .bind(from)
            .execute(&self.pool)
            .await?;

        Ok(moved)
    }
}

/// Null object for deployments that wire content references elsewhere.
/// Counts nothing and rewrites nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoContentRefs;

#[async_trait]
impl ContentRefs for NoContentRefs {
    fn is_authoritative(&self) -> bool {
        false
    }

    async fn count(&self, _tag_id: TagId) -> Result<i64, DatabaseError> {
        Ok(0)
    }

    async fn rewrite(&self, _from: TagId, _to: TagId) -> Result<u64, DatabaseError> {
        Ok(0)
    }
}
