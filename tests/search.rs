//! This module tests the read side: search, suggestions, popularity,
//! categories, and the tree.

mod common;

#[cfg(test)]
mod tests {
    use canopy::{
        hierarchy::{CreateTag, UpdateTag},
        models::{tag::TagStatus, Actor},
    };
    use uuid::Uuid;

    use crate::common::{setup, Harness};

    async fn create(h: &Harness, actor: &Actor, input: CreateTag) -> canopy::models::tag::Tag {
        h.engine.create(input, actor, None).await.expect("create tag")
    }

    /// The walkthrough scenario: three "cat"-ish names with tied usage come
    /// back ordered by name.
    #[tokio::test]
    async fn search_orders_ties_by_name() {
        let h = setup().await;
        let actor = Actor::contributor(Uuid::new_v4());

        for name in ["Category", "Cat", "Catfish"] {
            create(&h, &actor, CreateTag::named(name)).await;
        }

        let hits = h.queries.search("cat", None, None, Some(5)).await.unwrap();
        let names: Vec<_> = hits.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Cat", "Category", "Catfish"]);
    }

    #[tokio::test]
    async fn search_prefers_usage_then_quality() {
        let h = setup().await;
        let actor = Actor::contributor(Uuid::new_v4());

        let _cat = create(&h, &actor, CreateTag::named("Cat")).await;
        let catfish = create(&h, &actor, CreateTag::named("Catfish")).await;
        let _category = create(
            &h,
            &actor,
            CreateTag {
                name: "Category".into(),
                quality_score: Some(9.0),
                ..Default::default()
            },
        )
        .await;

        // catfish gets used twice, so it leads despite the name ordering
        h.store.set_usage(catfish.id, 2).await.unwrap();

        let hits = h.queries.search("cat", None, None, None).await.unwrap();
        let names: Vec<_> = hits.iter().map(|t| t.name.as_str()).collect();

        // usage first; then the higher-quality tag; plain "Cat" last
        assert_eq!(names, ["Catfish", "Category", "Cat"]);
    }

    #[tokio::test]
    async fn search_matches_aliases_and_alt_names_and_filters() {
        let h = setup().await;
        let actor = Actor::contributor(Uuid::new_v4());

        create(
            &h,
            &actor,
            CreateTag {
                name: "Feline".into(),
                aliases: vec!["housecat".into()],
                category: Some("biological".into()),
                domain: Some("zoology".into()),
                ..Default::default()
            },
        )
        .await;
        create(
            &h,
            &actor,
            CreateTag {
                name: "Bulldozer".into(),
                name_alt: Some("cat machine".into()),
                category: Some("artificial".into()),
                ..Default::default()
            },
        )
        .await;

        // alias hit
        let hits = h.queries.search("housecat", None, None, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Feline");

        // alternate-name hit, case-insensitive
        let hits = h.queries.search("CAT MACHINE", None, None, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Bulldozer");

        // category filter narrows it down
        let hits = h
            .queries
            .search("", Some("biological"), None, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Feline");

        // domain filter too
        let hits = h.queries.search("", None, Some("zoology"), None).await.unwrap();
        assert_eq!(hits.len(), 1);

        let hits = h.queries.search("", None, Some("botany"), None).await.unwrap();
        assert!(hits.is_empty());
    }

    /// Deprecated tags stay in search results; deleted and merged ones
    /// never show up.
    #[tokio::test]
    async fn deprecated_tags_stay_searchable() {
        let h = setup().await;
        let actor = Actor::contributor(Uuid::new_v4());

        let tag = create(&h, &actor, CreateTag::named("Betamax")).await;
        h.engine
            .update(
                tag.id,
                UpdateTag {
                    status: Some(TagStatus::Deprecated),
                    ..Default::default()
                },
                &actor,
                None,
            )
            .await
            .unwrap();

        let hits = h.queries.search("Betamax", None, None, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].status, TagStatus::Deprecated);
    }

    #[tokio::test]
    async fn suggestions_are_prefix_only() {
        let h = setup().await;
        let actor = Actor::contributor(Uuid::new_v4());

        let animal = create(&h, &actor, CreateTag::named("Animal")).await;
        create(&h, &actor, CreateTag::named("Cat").under(animal.id)).await;
        create(&h, &actor, CreateTag::named("Catfish")).await;
        create(&h, &actor, CreateTag::named("Bobcat")).await;

        let suggestions = h.queries.suggestions("Cat", None).await.unwrap();
        let names: Vec<_> = suggestions.iter().map(|s| s.name.as_str()).collect();

        // "Bobcat" contains but doesn't start with the prefix
        assert_eq!(names, ["Cat", "Catfish"]);

        // paths come along for display
        assert_eq!(suggestions[0].path, "Animal/Cat");
    }

    #[tokio::test]
    async fn popular_ranks_by_usage() {
        let h = setup().await;
        let actor = Actor::contributor(Uuid::new_v4());

        let quiet = create(&h, &actor, CreateTag::named("Quiet")).await;
        let busy = create(&h, &actor, CreateTag::named("Busy")).await;
        h.store.set_usage(busy.id, 10).await.unwrap();
        h.store.set_usage(quiet.id, 1).await.unwrap();

        let top = h.queries.popular(10).await.unwrap();
        assert_eq!(top[0].name, "Busy");
        assert_eq!(top[1].name, "Quiet");

        // limit caps the list
        let top = h.queries.popular(1).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn categories_aggregate_and_sort_by_count() {
        let h = setup().await;
        let actor = Actor::contributor(Uuid::new_v4());

        for (name, category) in [
            ("Cat", "biological"),
            ("Dog", "biological"),
            ("Fern", "biological"),
            ("Hammer", "artificial"),
        ] {
            create(
                &h,
                &actor,
                CreateTag {
                    name: name.into(),
                    category: Some(category.into()),
                    ..Default::default()
                },
            )
            .await;
        }

        let categories = h.queries.categories().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].category, "biological");
        assert_eq!(categories[0].count, 3);
        assert_eq!(categories[1].category, "artificial");
        assert_eq!(categories[1].count, 1);
    }

    #[tokio::test]
    async fn tree_depth_and_shallow_roots() {
        let h = setup().await;
        let actor = Actor::contributor(Uuid::new_v4());

        let animal = create(&h, &actor, CreateTag::named("Animal")).await;
        let cat = create(&h, &actor, CreateTag::named("Cat").under(animal.id)).await;
        create(&h, &actor, CreateTag::named("Siamese").under(cat.id)).await;
        create(&h, &actor, CreateTag::named("Plant")).await;

        // no root: every root as a shallow node, no children key at all
        let roots = h.queries.tree(None, 3, false).await.unwrap();
        let names: Vec<_> = roots.iter().map(|n| n.tag.name.as_str()).collect();
        assert_eq!(names, ["Animal", "Plant"]);
        assert!(roots.iter().all(|n| n.children.is_none()));

        // depth 0: just the node
        let nodes = h.queries.tree(Some(animal.id), 0, false).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].children.is_none());

        // depth 1: children present, grandchildren cut off
        let nodes = h.queries.tree(Some(animal.id), 1, false).await.unwrap();
        let children = nodes[0].children.as_ref().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].tag.name, "Cat");
        assert!(children[0].children.is_none());

        // depth 2 reaches the grandchild, which gets an empty list
        let nodes = h.queries.tree(Some(animal.id), 2, false).await.unwrap();
        let cat_node = &nodes[0].children.as_ref().unwrap()[0];
        let grandkids = cat_node.children.as_ref().unwrap();
        assert_eq!(grandkids.len(), 1);
        assert_eq!(grandkids[0].tag.name, "Siamese");

        // unknown root: empty tree
        let nodes = h.queries.tree(Some(Uuid::new_v4()), 2, false).await.unwrap();
        assert!(nodes.is_empty());
    }

    #[tokio::test]
    async fn tree_stats_count_and_refresh_usage() {
        let h = setup().await;
        let actor = Actor::contributor(Uuid::new_v4());

        let animal = create(&h, &actor, CreateTag::named("Animal")).await;
        let cat = create(&h, &actor, CreateTag::named("Cat").under(animal.id)).await;
        create(&h, &actor, CreateTag::named("Dog").under(animal.id)).await;
        create(&h, &actor, CreateTag::named("Siamese").under(cat.id)).await;

        // two entries reference Cat, but its cached count is stale (zero)
        h.refs.add(Uuid::new_v4(), cat.id).await.unwrap();
        h.refs.add(Uuid::new_v4(), cat.id).await.unwrap();

        let nodes = h.queries.tree(Some(animal.id), 2, true).await.unwrap();
        let root_stats = nodes[0].stats.unwrap();
        assert_eq!(root_stats.children_count, 2);
        assert_eq!(root_stats.total_descendants, 3);
        assert_eq!(root_stats.usage_count, 0);

        let cat_node = nodes[0]
            .children
            .as_ref()
            .unwrap()
            .iter()
            .find(|n| n.tag.name == "Cat")
            .unwrap();
        let cat_stats = cat_node.stats.unwrap();
        assert_eq!(cat_stats.children_count, 1);
        assert_eq!(cat_stats.usage_count, 2, "stats use the live count");

        // ...and the stale cache was repaired as a side effect
        let cat = h.store.get(cat.id).await.unwrap().unwrap();
        assert_eq!(cat.usage_count, 2);
    }

    #[tokio::test]
    async fn related_reads_both_ends_of_bidirectional_edges() {
        let h = setup().await;
        let actor = Actor::contributor(Uuid::new_v4());

        let cat = create(&h, &actor, CreateTag::named("Cat")).await;
        let tiger = create(&h, &actor, CreateTag::named("Tiger")).await;

        h.engine
            .relate(
                cat.id,
                tiger.id,
                canopy::models::relation::RelationType::Related,
                &actor,
            )
            .await
            .unwrap();

        // visible from either side
        assert_eq!(h.queries.related(cat.id).await.unwrap().len(), 1);
        assert_eq!(h.queries.related(tiger.id).await.unwrap().len(), 1);
    }
}
