//! Read-only traversal and search over the taxonomy.

use std::sync::Arc;

use sea_query::{Iden, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder as _;

use crate::{
    config::TaxonomyConfig,
    error::TaxonomyError,
    models::{
        history::TagHistory,
        relation::TagRelation,
        tag::{Tag, TagId},
    },
    refs::ContentRefs,
    store::TagStore,
};

pub mod search;
pub mod tree;

pub use tree::{TagStats, TreeNode};

/// the tags table
#[derive(Iden)]
pub enum Tags {
    Table,
    Id,
    Name,
    NameAlt,
    Description,
    DescriptionAlt,
    ParentId,
    Level,
    Path,
    Category,
    Domain,
    IsAbstract,
    IsSystem,
    Status,
    QualityScore,
    UsageCount,
    PopularityScore,
    Aliases,
    RelatedTags,
    ExternalLinks,
    Properties,
    ApplicableContentTypes,
    CreatedBy,
    ApprovedBy,
    ApprovedAt,
    CreatedAt,
    UpdatedAt,
}

/// A name-prefix completion hit.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Suggestion {
    pub id: TagId,
    pub name: String,
    pub path: String,
}

/// One row of the category aggregation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// The read side of the taxonomy.
///
/// Every listing here implicitly excludes `deleted` and `merged` rows.
/// Deprecated tags stay visible in search/popular/category results (callers
/// filter them out explicitly if they care); the tree shows active tags
/// only, since it's the curated navigation surface.
#[derive(Clone)]
pub struct TaxonomyQueryEngine {
    store: TagStore,
    refs: Arc<dyn ContentRefs>,
    config: TaxonomyConfig,
}

impl TaxonomyQueryEngine {
    pub fn new(store: TagStore, refs: Arc<dyn ContentRefs>, config: TaxonomyConfig) -> Self {
        Self {
            store,
            refs,
            config,
        }
    }

    /// Direct id lookup, any status. Audit and admin paths want this.
    pub async fn get(&self, id: TagId) -> Result<Option<Tag>, TaxonomyError> {
        Ok(self.store.get(id).await?)
    }

    /// Id lookup that transparently follows `merged_to` pointers to the
    /// surviving tag.
    pub async fn resolve(&self, id: TagId) -> Result<Option<Tag>, TaxonomyError> {
        Ok(self.store.resolve(id).await?)
    }

    /// Case-insensitive substring search over name, alternate name,
    /// description, and aliases. Ordered by usage, then quality, then name.
    #[tracing::instrument(skip(self))]
    pub async fn search(
        &self,
        keyword: &str,
        category: Option<&str>,
        domain: Option<&str>,
        limit: Option<u64>,
    ) -> Result<Vec<Tag>, TaxonomyError> {
        let limit = limit.unwrap_or(self.config.default_search_limit);
        let (sql, values) =
            search::search_statement(keyword, category, domain, limit).build_sqlx(SqliteQueryBuilder);

        let tags = sqlx::query_as_with::<_, Tag, _>(&sql, values)
            .fetch_all(self.store.pool())
            .await
            .map_err(crate::error::DatabaseError::from)?;

        tracing::debug!("search for `{keyword}` matched {} tag(s)", tags.len());
        Ok(tags)
    }

    /// Name-prefix completions.
    #[tracing::instrument(skip(self))]
    pub async fn suggestions(
        &self,
        partial_name: &str,
        limit: Option<u64>,
    ) -> Result<Vec<Suggestion>, TaxonomyError> {
        let limit = limit.unwrap_or(self.config.default_suggestion_limit);
        let (sql, values) =
            search::suggestions_statement(partial_name, limit).build_sqlx(SqliteQueryBuilder);

        let tags = sqlx::query_as_with::<_, Tag, _>(&sql, values)
            .fetch_all(self.store.pool())
            .await
            .map_err(crate::error::DatabaseError::from)?;

        Ok(tags
            .into_iter()
            .map(|t| Suggestion {
                id: t.id,
                name: t.name,
                path: t.path,
            })
            .collect())
    }

    /// The most-used tags, usage then popularity.
    #[tracing::instrument(skip(self))]
    pub async fn popular(&self, limit: u64) -> Result<Vec<Tag>, TaxonomyError> {
        let (sql, values) = search::popular_statement(limit).build_sqlx(SqliteQueryBuilder);

        let tags = sqlx::query_as_with::<_, Tag, _>(&sql, values)
            .fetch_all(self.store.pool())
            .await
            .map_err(crate::error::DatabaseError::from)?;
        Ok(tags)
    }

    /// Tag counts per category, largest first.
    #[tracing::instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<CategoryCount>, TaxonomyError> {
        let (sql, values) = search::categories_statement().build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_as_with::<_, (String, i64), _>(&sql, values)
            .fetch_all(self.store.pool())
            .await
            .map_err(crate::error::DatabaseError::from)?;

        Ok(rows
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect())
    }

    /// The tag tree.
    ///
    /// With a root id: that subtree, `max_depth` levels of children deep
    /// (`0` returns just the node, with no children list at all). Without
    /// one: every active root as a shallow node - descent only happens once
    /// a root is picked.
    #[tracing::instrument(skip(self))]
    pub async fn tree(
        &self,
        root_id: Option<TagId>,
        max_depth: u32,
        include_stats: bool,
    ) -> Result<Vec<TreeNode>, TaxonomyError> {
        tree::build(
            &self.store,
            self.refs.as_ref(),
            root_id,
            max_depth,
            include_stats,
        )
        .await
    }

    /// Audit history for a tag, most recent action first.
    pub async fn history(
        &self,
        tag_id: TagId,
        limit: Option<u64>,
    ) -> Result<Vec<TagHistory>, TaxonomyError> {
        let limit = limit.unwrap_or(self.config.default_history_limit);
        Ok(self.store.history_for(tag_id, limit).await?)
    }

    /// Active non-hierarchical relations touching a tag.
    pub async fn related(&self, tag_id: TagId) -> Result<Vec<TagRelation>, TaxonomyError> {
        Ok(self.store.relations_for(tag_id).await?)
    }
}
