//! Installs the system root taxonomy on a fresh deployment.
//!
//! The seeded parents are exactly the names the classifier's knowledge
//! tables can nominate, so auto-classification works out of the box.

use crate::{
    error::TaxonomyError,
    hierarchy::{CreateTag, HierarchyEngine},
    models::{tag::Tag, Actor},
};

/// Creates the system root plus one system tag per knowledge-table parent.
///
/// Idempotent: names that already resolve to an active tag are skipped, so
/// re-running on a populated store is a no-op. Returns only the tags that
/// were actually created.
pub async fn install_system_roots(
    engine: &HierarchyEngine,
    actor: &Actor,
) -> Result<Vec<Tag>, TaxonomyError> {
    let knowledge = engine.config().knowledge.clone();
    let mut created = Vec::new();

    let root = match engine.store().get_active_by_name(&knowledge.root_name).await? {
        Some(existing) => existing,
        None => {
            let tag = engine
                .create(
                    CreateTag {
                        name: knowledge.root_name.clone(),
                        description: "Root of the taxonomy. All things live underneath.".into(),
                        is_abstract: true,
                        is_system: true,
                        quality_score: Some(10.0),
                        ..Default::default()
                    },
                    actor,
                    None,
                )
                .await?;
            created.push(tag.clone());
            tag
        }
    };

    for (name, category, is_abstract) in knowledge.system_parents() {
        if engine.store().get_active_by_name(&name).await?.is_some() {
            continue;
        }

        let tag = engine
            .create(
                CreateTag {
                    name,
                    parent_id: Some(root.id),
                    category: Some(category),
                    is_abstract,
                    is_system: true,
                    quality_score: Some(engine.config().system_quality_score),
                    ..Default::default()
                },
                actor,
                None,
            )
            .await?;
        created.push(tag);
    }

    if !created.is_empty() {
        tracing::info!("seeded {} system tag(s)", created.len());
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::{
        config::TaxonomyConfig, database, refs::NoContentRefs, store::TagStore,
    };

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let pool = database::connect_in_memory().await.unwrap();
        let engine = HierarchyEngine::new(
            TagStore::new(pool),
            Arc::new(NoContentRefs),
            TaxonomyConfig::default(),
        );
        let admin = Actor::admin(Uuid::new_v4());

        let first = install_system_roots(&engine, &admin).await.unwrap();
        assert!(!first.is_empty());

        // root + every knowledge parent
        let expected = 1 + engine.config().knowledge.system_parents().len();
        assert_eq!(first.len(), expected);

        let root = &first[0];
        assert_eq!(root.level, 0);
        assert_eq!(root.quality_score, 10.0);
        assert!(first[1..]
            .iter()
            .all(|t| t.parent_id == Some(root.id) && t.level == 1 && t.is_system));

        let second = install_system_roots(&engine, &admin).await.unwrap();
        assert!(second.is_empty(), "re-seeding must create nothing");
    }
}
