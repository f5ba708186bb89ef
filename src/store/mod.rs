//! Row-level access to the taxonomy tables.
//!
//! [`TagStore`] exclusively owns `Tag`, `TagHistory`, and `TagRelation`
//! rows. The hierarchy engine is the only caller that writes structural
//! fields (parent, level, path, status); everything else reads.

use sqlx::{query::Query, sqlite::SqliteArguments, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::{
    database::Db,
    error::DatabaseError,
    models::{
        history::TagHistory,
        relation::{RelationStatus, TagRelation},
        tag::{Tag, TagId, TagStatus},
    },
};

/// A model must become a query to land in its table.
pub trait InsertIntoTable {
    /// Builds the upsert statement for this row.
    ///
    /// `ON CONFLICT (id)` replaces every mutable column, so the same query
    /// doubles as a full-row update.
    fn make_insertion_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>>;
}

impl InsertIntoTable for Tag {
    fn make_insertion_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            r#"
        INSERT INTO tags
        (id, name, name_alt, description, description_alt, parent_id, level, path,
         category, domain, is_abstract, is_system, status, quality_score, usage_count,
         popularity_score, aliases, related_tags, external_links, properties,
         applicable_content_types, created_by, approved_by, approved_at, created_at, updated_at)
        VALUES
        ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
         $19, $20, $21, $22, $23, $24, $25, $26)
        ON CONFLICT (id)
        DO UPDATE SET
            name = excluded.name,
            name_alt = excluded.name_alt,
            description = excluded.description,
            description_alt = excluded.description_alt,
            parent_id = excluded.parent_id,
            level = excluded.level,
            path = excluded.path,
            category = excluded.category,
            domain = excluded.domain,
            is_abstract = excluded.is_abstract,
            is_system = excluded.is_system,
            status = excluded.status,
            quality_score = excluded.quality_score,
            usage_count = excluded.usage_count,
            popularity_score = excluded.popularity_score,
            aliases = excluded.aliases,
            related_tags = excluded.related_tags,
            external_links = excluded.external_links,
            properties = excluded.properties,
            applicable_content_types = excluded.applicable_content_types,
            approved_by = excluded.approved_by,
            approved_at = excluded.approved_at,
            updated_at = excluded.updated_at;
        "#,
        )
        .bind(self.id)
        .bind(self.name.as_str())
        .bind(self.name_alt.clone())
        .bind(self.description.as_str())
        .bind(self.description_alt.clone())
        .bind(self.parent_id)
        .bind(self.level)
        .bind(self.path.as_str())
        .bind(self.category.as_str())
        .bind(self.domain.as_str())
        .bind(self.is_abstract)
        .bind(self.is_system)
        .bind(self.status)
        .bind(self.quality_score)
        .bind(self.usage_count)
        .bind(self.popularity_score)
        .bind(self.aliases.clone())
        .bind(self.related_tags.clone())
        .bind(self.external_links.clone())
        .bind(self.properties.clone())
        .bind(self.applicable_content_types.clone())
        .bind(self.created_by)
        .bind(self.approved_by)
        .bind(self.approved_at)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

impl InsertIntoTable for TagHistory {
    fn make_insertion_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        // history is append-only, so no conflict arm here
        sqlx::query(
            r#"
        INSERT INTO tag_history
        (id, tag_id, action, old_data, new_data, diff, user_id, user_agent, ip_address,
         reviewed_by, reviewed_at, review_status, review_comment, created_at)
        VALUES
        ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14);
        "#,
        )
        .bind(self.id)
        .bind(self.tag_id)
        .bind(self.action)
        .bind(self.old_data.clone())
        .bind(self.new_data.clone())
        .bind(self.diff.clone())
        .bind(self.user_id)
        .bind(self.user_agent.clone())
        .bind(self.ip_address.clone())
        .bind(self.reviewed_by)
        .bind(self.reviewed_at)
        .bind(self.review_status)
        .bind(self.review_comment.clone())
        .bind(self.created_at)
    }
}

impl InsertIntoTable for TagRelation {
    fn make_insertion_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            r#"
        INSERT INTO tag_relations
        (id, from_tag_id, to_tag_id, relation_type, strength, is_bidirectional, description,
         properties, created_by, approved_by, status, created_at, updated_at)
        VALUES
        ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (from_tag_id, to_tag_id, relation_type)
        DO UPDATE SET
            strength = excluded.strength,
            is_bidirectional = excluded.is_bidirectional,
            description = excluded.description,
            properties = excluded.properties,
            status = excluded.status,
            updated_at = excluded.updated_at;
        "#,
        )
        .bind(self.id)
        .bind(self.from_tag_id)
        .bind(self.to_tag_id)
        .bind(self.relation_type)
        .bind(self.strength)
        .bind(self.is_bidirectional)
        .bind(self.description.clone())
        .bind(self.properties.clone())
        .bind(self.created_by)
        .bind(self.approved_by)
        .bind(self.status)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

/// Handle to the taxonomy tables. Cheap to clone; holds the pool.
#[derive(Clone, Debug)]
pub struct TagStore {
    pool: Db,
}

impl TagStore {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Db {
        &self.pool
    }

    /// Inserts a row, or replaces it wholesale when the id already exists.
    pub async fn upsert(&self, row: &impl InsertIntoTable) -> Result<(), DatabaseError> {
        row.make_insertion_query().execute(&self.pool).await?;
        Ok(())
    }

    /// Same as [`TagStore::upsert`] but on an explicit connection, for use
    /// inside a transaction.
    pub(crate) async fn upsert_in(
        conn: &mut SqliteConnection,
        row: &impl InsertIntoTable,
    ) -> Result<(), DatabaseError> {
        row.make_insertion_query().execute(conn).await?;
        Ok(())
    }

    /// Fetches a tag by id, whatever its status. Audit paths want this.
    pub async fn get(&self, id: TagId) -> Result<Option<Tag>, DatabaseError> {
        let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    /// Fetches a tag by id, but only if it's active.
    pub async fn get_active(&self, id: TagId) -> Result<Option<Tag>, DatabaseError> {
        let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(TagStatus::Active)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    /// Fetches the active tag with this exact name, if there is one.
    pub async fn get_active_by_name(&self, name: &str) -> Result<Option<Tag>, DatabaseError> {
        let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE name = $1 AND status = $2")
            .bind(name)
            .bind(TagStatus::Active)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    /// Resolves an id to a usable tag, transparently following `merged_to`
    /// pointers. Bounded by the table size in case of pointer corruption.
    pub async fn resolve(&self, id: TagId) -> Result<Option<Tag>, DatabaseError> {
        let bound = self.count_all().await?;
        let mut hops = 0_i64;
        let mut current = self.get(id).await?;

        while let Some(tag) = &current {
            if tag.status != TagStatus::Merged {
                break;
            }

            hops += 1;
            if hops > bound {
                tracing::warn!("merged_to chain from `{id}` exceeds tag count; giving up");
                return Ok(None);
            }

            match tag.merged_to() {
                Some(next) => current = self.get(next).await?,
                None => {
                    // invariant says this shouldn't happen, but a broken
                    // pointer is not worth a panic
                    tracing::warn!("merged tag `{}` has no merged_to pointer", tag.id);
                    break;
                }
            }
        }

        Ok(current)
    }

    pub async fn count_all(&self) -> Result<i64, DatabaseError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Active children of a tag, ordered by name.
    pub async fn active_children(&self, id: TagId) -> Result<Vec<Tag>, DatabaseError> {
        let children = sqlx::query_as::<_, Tag>(
            "SELECT * FROM tags WHERE parent_id = $1 AND status = $2 ORDER BY name ASC",
        )
        .bind(id)
        .bind(TagStatus::Active)
        .fetch_all(&self.pool)
        .await?;
        Ok(children)
    }

    pub async fn active_children_count(&self, id: TagId) -> Result<i64, DatabaseError> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tags WHERE parent_id = $1 AND status = $2",
        )
        .bind(id)
        .bind(TagStatus::Active)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    /// Active root tags (no parent), ordered by name.
    pub async fn active_roots(&self) -> Result<Vec<Tag>, DatabaseError> {
        let roots = sqlx::query_as::<_, Tag>(
            "SELECT * FROM tags WHERE parent_id IS NULL AND status = $1 ORDER BY name ASC",
        )
        .bind(TagStatus::Active)
        .fetch_all(&self.pool)
        .await?;
        Ok(roots)
    }

    /// Walks parent pointers from `start` (inclusive) up to a root.
    ///
    /// The walk is bounded by the total tag count: a chain longer than the
    /// table means the tree is corrupt, and we stop rather than spin.
    pub async fn ancestor_ids(&self, start: TagId) -> Result<Vec<TagId>, DatabaseError> {
        let bound = self.count_all().await?;
        let mut chain = Vec::new();
        let mut current = Some(start);

        while let Some(id) = current {
            chain.push(id);

            if chain.len() as i64 > bound {
                tracing::warn!("ancestor chain from `{start}` exceeds tag count; tree corrupt?");
                break;
            }

            current = sqlx::query_scalar::<_, Option<Uuid>>(
                "SELECT parent_id FROM tags WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .flatten();
        }

        Ok(chain)
    }

    /// Counts every active descendant of a tag, however deep.
    pub async fn active_descendant_count(&self, id: TagId) -> Result<i64, DatabaseError> {
        let mut count = 0_i64;
        let mut frontier = vec![id];

        while let Some(current) = frontier.pop() {
            let kids = sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM tags WHERE parent_id = $1 AND status = $2",
            )
            .bind(current)
            .bind(TagStatus::Active)
            .fetch_all(&self.pool)
            .await?;

            count += kids.len() as i64;
            frontier.extend(kids);
        }

        Ok(count)
    }

    /// Overwrites a tag's usage count (and the popularity score derived
    /// from it). Used when the live content-reference count disagrees with
    /// the cached one.
    pub async fn set_usage(&self, id: TagId, usage_count: i64) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE tags SET usage_count = $2, popularity_score = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(usage_count)
        .bind(Tag::popularity_for(usage_count))
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Bumps a tag's usage count by one. Called by content-tagging flows.
    pub async fn record_usage(&self, id: TagId) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE tags
             SET usage_count = usage_count + 1,
                 popularity_score = (usage_count + 1) * 0.1,
                 updated_at = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// History for one tag, most recent action first.
    pub async fn history_for(
        &self,
        tag_id: TagId,
        limit: u64,
    ) -> Result<Vec<TagHistory>, DatabaseError> {
        let rows = sqlx::query_as::<_, TagHistory>(
            "SELECT * FROM tag_history WHERE tag_id = $1
             ORDER BY created_at DESC, rowid DESC LIMIT $2",
        )
        .bind(tag_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Active relations touching a tag, from either end of bidirectional
    /// edges.
    pub async fn relations_for(&self, tag_id: TagId) -> Result<Vec<TagRelation>, DatabaseError> {
        let rows = sqlx::query_as::<_, TagRelation>(
            "SELECT * FROM tag_relations
             WHERE status = $2
               AND (from_tag_id = $1 OR (to_tag_id = $1 AND is_bidirectional))",
        )
        .bind(tag_id)
        .bind(RelationStatus::Active)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Active tags whose name contains the fragment. Feeds the classifier's
    /// similar-name suggestions.
    pub async fn name_contains(&self, fragment: &str, limit: u64) -> Result<Vec<Tag>, DatabaseError> {
        let pattern = format!("%{fragment}%");
        let rows = sqlx::query_as::<_, Tag>(
            "SELECT * FROM tags WHERE status = $1 AND name LIKE $2 LIMIT $3",
        )
        .bind(TagStatus::Active)
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
