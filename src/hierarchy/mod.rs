//! Structural mutations on the tag graph.
//!
//! Every write that touches hierarchy fields (parent, level, path, status)
//! goes through [`HierarchyEngine`], which enforces the no-cycle invariant,
//! keeps the derived path/level caches consistent, and leaves one history
//! record per mutation.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::TaxonomyConfig,
    error::TaxonomyError,
    models::{
        history::{ClientMeta, HistoryAction},
        relation::{RelationType, TagRelation},
        tag::{Properties, Tag, TagId, TagStatus, MERGED_TO_KEY},
        Actor,
    },
    refs::ContentRefs,
    store::TagStore,
};

pub mod history;
pub mod path;

use history::HistoryRecorder;
use path::PathResolver;

/// Everything needed to create a tag. Only `name` is required.
#[derive(Clone, Debug, Default)]
pub struct CreateTag {
    pub name: String,
    pub name_alt: Option<String>,
    pub description: String,
    pub description_alt: Option<String>,
    pub parent_id: Option<TagId>,
    pub category: Option<String>,
    pub domain: Option<String>,
    pub is_abstract: bool,
    pub is_system: bool,
    pub aliases: Vec<String>,
    pub external_links: Vec<String>,
    pub properties: Properties,
    pub applicable_content_types: Vec<String>,
    /// Overrides the configured default. Clamped to 0-10.
    pub quality_score: Option<f64>,
}

impl CreateTag {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn under(mut self, parent_id: TagId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Non-structural field edits. `None` leaves a field alone.
#[derive(Clone, Debug, Default)]
pub struct UpdateTag {
    pub name_alt: Option<String>,
    pub description: Option<String>,
    pub description_alt: Option<String>,
    pub category: Option<String>,
    pub domain: Option<String>,
    pub is_abstract: Option<bool>,
    pub aliases: Option<Vec<String>>,
    pub related_tags: Option<Vec<TagId>>,
    pub external_links: Option<Vec<String>>,
    pub properties: Option<Properties>,
    pub applicable_content_types: Option<Vec<String>>,
    pub quality_score: Option<f64>,
    /// Only `Active` and `Deprecated` are reachable here; merges and
    /// deletions go through their own operations.
    pub status: Option<TagStatus>,
}

pub struct HierarchyEngine {
    store: TagStore,
    history: HistoryRecorder,
    refs: Arc<dyn ContentRefs>,
    config: TaxonomyConfig,

    /// Serializes structural mutations. Coarse, but every operation here is
    /// a handful of point queries, and sqlite is single-writer anyway.
    write_lock: Mutex<()>,
}

impl HierarchyEngine {
    pub fn new(store: TagStore, refs: Arc<dyn ContentRefs>, config: TaxonomyConfig) -> Self {
        let history = HistoryRecorder::new(store.clone());
        Self {
            store,
            history,
            refs,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &TagStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub fn config(&self) -> &TaxonomyConfig {
        &self.config
    }

    /// Creates a new active tag, optionally under a parent.
    #[tracing::instrument(skip(self, input, client), fields(name = %input.name))]
    pub async fn create(
        &self,
        input: CreateTag,
        actor: &Actor,
        client: Option<ClientMeta>,
    ) -> Result<Tag, TaxonomyError> {
        let _guard = self.write_lock.lock().await;

        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(TaxonomyError::EmptyName);
        }

        let len = name.chars().count();
        if len > self.config.max_name_len {
            return Err(TaxonomyError::NameTooLong {
                name,
                len,
                max: self.config.max_name_len,
            });
        }

        if !actor.can_create_tags {
            return Err(TaxonomyError::PermissionDenied {
                actor_id: actor.id,
                capability: "can_create_tags",
            });
        }

        if self.store.get_active_by_name(&name).await?.is_some() {
            return Err(TaxonomyError::NameTaken { name });
        }

        let parent = match input.parent_id {
            Some(pid) => Some(
                self.store
                    .get_active(pid)
                    .await?
                    .ok_or(TaxonomyError::ParentNotFound(pid))?,
            ),
            None => None,
        };

        let (level, path) = PathResolver::derive(parent.as_ref(), &name);
        let now = Utc::now();

        let tag = Tag {
            id: Uuid::new_v4(),
            name,
            name_alt: input.name_alt,
            description: input.description,
            description_alt: input.description_alt,
            parent_id: parent.as_ref().map(|p| p.id),
            level,
            path,
            category: input.category.unwrap_or_else(|| "general".into()),
            domain: input.domain.unwrap_or_else(|| "general".into()),
            is_abstract: input.is_abstract,
            is_system: input.is_system,
            status: TagStatus::Active,
            quality_score: input
                .quality_score
                .unwrap_or(self.config.default_quality_score)
                .clamp(0.0, 10.0),
            usage_count: 0,
            popularity_score: 0.0,
            aliases: Json(input.aliases),
            related_tags: Json(vec![]),
            external_links: Json(input.external_links),
            properties: Json(input.properties),
            applicable_content_types: Json(if input.applicable_content_types.is_empty() {
                ["text", "image", "video", "audio"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            } else {
                input.applicable_content_types
            }),
            created_by: actor.id,
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store.upsert(&tag).await?;
        tracing::info!("created tag `{}` at `{}`", tag.name, tag.path);

        self.history
            .record(
                tag.id,
                HistoryAction::Create,
                actor.id,
                None,
                Some(tag.snapshot()),
                client,
            )
            .await;

        Ok(tag)
    }

    /// Moves a tag under a new parent (or to root, with `None`), cascading
    /// the path/level recompute through every descendant.
    #[tracing::instrument(skip(self, client))]
    pub async fn move_tag(
        &self,
        tag_id: TagId,
        new_parent_id: Option<TagId>,
        actor: &Actor,
        client: Option<ClientMeta>,
    ) -> Result<(), TaxonomyError> {
        let _guard = self.write_lock.lock().await;

        let tag = self
            .store
            .get_active(tag_id)
            .await?
            .ok_or(TaxonomyError::TagNotFound(tag_id))?;

        let new_parent = match new_parent_id {
            Some(pid) => {
                if pid == tag_id {
                    return Err(TaxonomyError::CycleDetected {
                        tag_id,
                        new_parent_id: pid,
                    });
                }

                let parent = self
                    .store
                    .get_active(pid)
                    .await?
                    .ok_or(TaxonomyError::ParentNotFound(pid))?;

                // the prospective parent must not sit underneath the tag
                // being moved, or the chain would loop
                if self.store.ancestor_ids(pid).await?.contains(&tag_id) {
                    return Err(TaxonomyError::CycleDetected {
                        tag_id,
                        new_parent_id: pid,
                    });
                }

                Some(parent)
            }
            None => None,
        };

        let old = json!({
            "parent_id": tag.parent_id,
            "level": tag.level,
            "path": tag.path,
        });

        let (level, path) = PathResolver::derive(new_parent.as_ref(), &tag.name);
        let now = Utc::now();

        let mut moved = tag.clone();
        moved.parent_id = new_parent.as_ref().map(|p| p.id);
        moved.level = level;
        moved.path = path.clone();
        moved.updated_at = now;

        let mut tx = self.store.pool().begin().await?;
        TagStore::upsert_in(&mut tx, &moved).await?;
        PathResolver::cascade(&mut tx, moved.id, level, &path, now).await?;
        tx.commit().await?;

        tracing::info!(
            "moved tag `{}` -> `{}`",
            tag.name,
            new_parent.as_ref().map_or("root", |p| p.name.as_str())
        );

        let new = json!({
            "parent_id": moved.parent_id,
            "level": level,
            "path": path,
        });
        self.history
            .record(
                tag_id,
                HistoryAction::Move,
                actor.id,
                Some(old),
                Some(new),
                client,
            )
            .await;

        Ok(())
    }

    /// Folds `source_id` into `target_id`: content references repointed,
    /// usage added, aliases unioned, source retired with a `merged_to`
    /// pointer. The source row is kept for referential history.
    #[tracing::instrument(skip(self, client))]
    pub async fn merge(
        &self,
        source_id: TagId,
        target_id: TagId,
        actor: &Actor,
        client: Option<ClientMeta>,
    ) -> Result<(), TaxonomyError> {
        let _guard = self.write_lock.lock().await;

        if source_id == target_id {
            return Err(TaxonomyError::MergeSelf(source_id));
        }

        let source = self
            .store
            .get_active(source_id)
            .await?
            .ok_or(TaxonomyError::TagNotFound(source_id))?;
        let target = self
            .store
            .get_active(target_id)
            .await?
            .ok_or(TaxonomyError::TagNotFound(target_id))?;

        // repoint content references first. the tag-side flip below is
        // transactional; the window between the two is covered by the
        // engine's write lock for taxonomy callers (see DESIGN.md)
        let rewritten = self.refs.rewrite(source_id, target_id).await?;

        let now = Utc::now();

        let mut new_target = target.clone();
        new_target.usage_count = target.usage_count + source.usage_count;
        new_target.popularity_score = Tag::popularity_for(new_target.usage_count);
        for alias in source.aliases.0.iter() {
            if !new_target.aliases.0.contains(alias) {
                new_target.aliases.0.push(alias.clone());
            }
        }
        new_target.updated_at = now;

        let mut new_source = source.clone();
        new_source.status = TagStatus::Merged;
        new_source
            .properties
            .0
            .insert(MERGED_TO_KEY.into(), Value::String(target_id.to_string()));
        new_source.updated_at = now;

        let mut tx = self.store.pool().begin().await?;
        TagStore::upsert_in(&mut tx, &new_target).await?;
        TagStore::upsert_in(&mut tx, &new_source).await?;
        tx.commit().await?;

        tracing::info!(
            "merged tag `{}` into `{}` ({rewritten} content reference(s) rewritten)",
            source.name,
            target.name
        );

        self.history
            .record(
                source_id,
                HistoryAction::Merge,
                actor.id,
                Some(source.snapshot()),
                Some(json!({ "status": "merged", MERGED_TO_KEY: target_id })),
                client,
            )
            .await;

        Ok(())
    }

    /// Soft-deletes a tag. The row stays queryable by id for audit, but
    /// drops out of every listing, search, and tree result.
    #[tracing::instrument(skip(self, client))]
    pub async fn delete(
        &self,
        tag_id: TagId,
        actor: &Actor,
        client: Option<ClientMeta>,
    ) -> Result<(), TaxonomyError> {
        let _guard = self.write_lock.lock().await;

        let tag = self
            .store
            .get(tag_id)
            .await?
            .ok_or(TaxonomyError::TagNotFound(tag_id))?;

        if !tag.status.can_transition_to(TagStatus::Deleted) {
            return Err(TaxonomyError::InvalidStatusTransition {
                from: tag.status,
                to: TagStatus::Deleted,
            });
        }

        // creators may delete their own tags; anything else (including
        // system tags) takes the approval capability
        let is_creator = tag.created_by == actor.id;
        let allowed = if tag.is_system {
            actor.can_approve_changes
        } else {
            is_creator || actor.can_approve_changes
        };
        if !allowed {
            return Err(TaxonomyError::PermissionDenied {
                actor_id: actor.id,
                capability: "can_approve_changes",
            });
        }

        let children = self.store.active_children_count(tag_id).await?;
        if children > 0 {
            return Err(TaxonomyError::HasActiveChildren { count: children });
        }

        let referenced = self.refs.count(tag_id).await?;
        if referenced > 0 {
            return Err(TaxonomyError::ReferencedByContent { count: referenced });
        }

        let mut deleted = tag.clone();
        deleted.status = TagStatus::Deleted;
        deleted.updated_at = Utc::now();
        self.store.upsert(&deleted).await?;

        tracing::info!("soft-deleted tag `{}`", tag.name);

        self.history
            .record(
                tag_id,
                HistoryAction::Delete,
                actor.id,
                Some(tag.snapshot()),
                Some(json!({ "status": "deleted" })),
                client,
            )
            .await;

        Ok(())
    }

    /// Edits non-structural fields and active/deprecated status flips.
    #[tracing::instrument(skip(self, changes, client))]
    pub async fn update(
        &self,
        tag_id: TagId,
        changes: UpdateTag,
        actor: &Actor,
        client: Option<ClientMeta>,
    ) -> Result<Tag, TaxonomyError> {
        let _guard = self.write_lock.lock().await;

        if !actor.can_edit_tags {
            return Err(TaxonomyError::PermissionDenied {
                actor_id: actor.id,
                capability: "can_edit_tags",
            });
        }

        let tag = self
            .store
            .get(tag_id)
            .await?
            .ok_or(TaxonomyError::TagNotFound(tag_id))?;

        if tag.status.is_terminal() {
            return Err(TaxonomyError::TagNotActive {
                id: tag_id,
                status: tag.status,
            });
        }

        if let Some(q) = changes.quality_score {
            if !(0.0..=10.0).contains(&q) {
                return Err(TaxonomyError::BadInput(format!(
                    "quality_score must be within 0-10, got {q}"
                )));
            }
        }

        if let Some(next) = changes.status {
            if !matches!(next, TagStatus::Active | TagStatus::Deprecated) {
                return Err(TaxonomyError::BadInput(
                    "status can only be set to active or deprecated here; use merge/delete".into(),
                ));
            }

            if next != tag.status {
                if !tag.status.can_transition_to(next) {
                    return Err(TaxonomyError::InvalidStatusTransition {
                        from: tag.status,
                        to: next,
                    });
                }

                // restoring a deprecated tag collides if someone re-took
                // the name while it was shelved
                if next == TagStatus::Active
                    && self.store.get_active_by_name(&tag.name).await?.is_some()
                {
                    return Err(TaxonomyError::NameTaken {
                        name: tag.name.clone(),
                    });
                }
            }
        }

        let mut updated = tag.clone();
        let mut old_fields = serde_json::Map::new();
        let mut new_fields = serde_json::Map::new();

        macro_rules! apply {
            ($field:ident, $wrap:expr) => {
                if let Some(v) = changes.$field {
                    old_fields.insert(stringify!($field).into(), json!(tag.$field));
                    updated.$field = $wrap(v);
                    new_fields.insert(stringify!($field).into(), json!(updated.$field));
                }
            };
        }

        apply!(name_alt, Some);
        apply!(description, |v| v);
        apply!(description_alt, Some);
        apply!(category, |v| v);
        apply!(domain, |v| v);
        apply!(is_abstract, |v| v);
        apply!(aliases, Json);
        apply!(related_tags, Json);
        apply!(external_links, Json);
        apply!(properties, Json);
        apply!(applicable_content_types, Json);
        apply!(quality_score, |v| v);
        apply!(status, |v| v);

        if old_fields.is_empty() {
            // nothing to do; hand the row back untouched
            return Ok(tag);
        }

        updated.updated_at = Utc::now();
        self.store.upsert(&updated).await?;

        self.history
            .record(
                tag_id,
                HistoryAction::Update,
                actor.id,
                Some(Value::Object(old_fields)),
                Some(Value::Object(new_fields)),
                client,
            )
            .await;

        Ok(updated)
    }

    /// Stamps a tag as approved by the acting user.
    #[tracing::instrument(skip(self, client))]
    pub async fn approve(
        &self,
        tag_id: TagId,
        actor: &Actor,
        client: Option<ClientMeta>,
    ) -> Result<Tag, TaxonomyError> {
        let _guard = self.write_lock.lock().await;

        if !actor.can_approve_changes {
            return Err(TaxonomyError::PermissionDenied {
                actor_id: actor.id,
                capability: "can_approve_changes",
            });
        }

        let tag = self
            .store
            .get(tag_id)
            .await?
            .ok_or(TaxonomyError::TagNotFound(tag_id))?;

        if tag.status.is_terminal() {
            return Err(TaxonomyError::TagNotActive {
                id: tag_id,
                status: tag.status,
            });
        }

        let now = Utc::now();
        let mut approved = tag.clone();
        approved.approved_by = Some(actor.id);
        approved.approved_at = Some(now);
        approved.updated_at = now;
        self.store.upsert(&approved).await?;

        self.history
            .record(
                tag_id,
                HistoryAction::Update,
                actor.id,
                Some(json!({ "approved_by": tag.approved_by, "approved_at": tag.approved_at })),
                Some(json!({ "approved_by": approved.approved_by, "approved_at": approved.approved_at })),
                client,
            )
            .await;

        Ok(approved)
    }

    /// Records a typed, non-hierarchical edge between two active tags.
    #[tracing::instrument(skip(self))]
    pub async fn relate(
        &self,
        from: TagId,
        to: TagId,
        relation_type: RelationType,
        actor: &Actor,
    ) -> Result<TagRelation, TaxonomyError> {
        let _guard = self.write_lock.lock().await;

        if !actor.can_edit_tags {
            return Err(TaxonomyError::PermissionDenied {
                actor_id: actor.id,
                capability: "can_edit_tags",
            });
        }

        if from == to {
            return Err(TaxonomyError::BadInput(
                "a tag cannot relate to itself".into(),
            ));
        }

        for id in [from, to] {
            if self.store.get_active(id).await?.is_none() {
                return Err(TaxonomyError::TagNotFound(id));
            }
        }

        let relation = TagRelation::new(from, to, relation_type, actor.id);
        self.store.upsert(&relation).await?;
        Ok(relation)
    }
}
