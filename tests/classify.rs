//! This module tests auto-classification against a seeded taxonomy.

mod common;

#[cfg(test)]
mod tests {
    use canopy::{
        classify::{DetectedObject, RecognitionContext},
        hierarchy::CreateTag,
        models::Actor,
        seed,
    };
    use uuid::Uuid;

    use crate::common::{setup, Harness};

    async fn seeded() -> (Harness, Actor) {
        let h = setup().await;
        let admin = Actor::admin(Uuid::new_v4());
        seed::install_system_roots(&h.engine, &admin)
            .await
            .expect("seed system roots");
        (h, admin)
    }

    #[tokio::test]
    async fn dictionary_names_land_under_their_parent() {
        let (h, _) = seeded().await;

        // "kitty" canonicalizes to "cat", which is an Animal keyword
        let suggested = h
            .classifier
            .suggest_parent("Kitty", None, None)
            .await
            .unwrap()
            .expect("a parent should be found");
        assert_eq!(suggested.name, "Animal");
    }

    /// Two signal sources nominating the same parent keep the *maximum*
    /// contribution, never the sum.
    #[tokio::test]
    async fn same_parent_signals_take_the_max_not_the_sum() {
        let (h, _) = seeded().await;

        // name source: "cat" is an exact Animal keyword -> 0.9
        // context source: a detected cat at 0.3 nominates Animal again
        let ctx = RecognitionContext {
            objects: vec![DetectedObject {
                label: "cat".into(),
                confidence: 0.3,
            }],
            description: None,
            colors: vec![],
        };

        let ranked = h.classifier.rank("cat", None, Some(&ctx)).await.unwrap();
        let top = &ranked[0];
        assert_eq!(top.tag.name, "Animal");

        // seeded parents carry quality 8.0 and no usage:
        // max(0.9, 0.3) * 1.0 * (8.0 / 10.0) = 0.72.
        // summing instead would give 0.96 - make sure we didn't.
        assert!((top.score - 0.72).abs() < 1e-9, "got {}", top.score);
    }

    #[tokio::test]
    async fn usage_and_quality_scale_the_confidence() {
        let (h, _) = seeded().await;

        let animal = h.store.get_active_by_name("Animal").await.unwrap().unwrap();

        // crank usage past the cap: min(1.2, 1 + 400/100) = 1.2
        h.store.set_usage(animal.id, 400).await.unwrap();

        let ranked = h.classifier.rank("cat", None, None).await.unwrap();
        let top = &ranked[0];
        assert_eq!(top.tag.name, "Animal");

        // 0.9 * 1.2 * 0.8
        assert!((top.score - 0.864).abs() < 1e-9, "got {}", top.score);
    }

    #[tokio::test]
    async fn unresolvable_candidates_mean_no_suggestion() {
        let h = setup().await; // note: nothing seeded

        let suggested = h
            .classifier
            .suggest_parent("cat", None, None)
            .await
            .unwrap();
        assert!(
            suggested.is_none(),
            "no existing tags -> nothing to suggest; caller creates a root"
        );
    }

    #[tokio::test]
    async fn colors_route_to_the_color_parent() {
        let (h, _) = seeded().await;

        let suggested = h
            .classifier
            .suggest_parent("Crimson red", None, None)
            .await
            .unwrap()
            .expect("color parent exists after seeding");
        assert_eq!(suggested.name, "Color");
    }

    #[tokio::test]
    async fn recognition_context_alone_is_enough() {
        let (h, _) = seeded().await;

        let ctx = RecognitionContext {
            objects: vec![
                DetectedObject {
                    label: "dog".into(),
                    confidence: 0.95,
                },
                DetectedObject {
                    label: "frisbee".into(), // unknown label, ignored
                    confidence: 0.9,
                },
            ],
            description: Some("an outdoor park scene".into()),
            colors: vec![],
        };

        let ranked = h
            .classifier
            .rank("Buddy", None, Some(&ctx))
            .await
            .unwrap();

        // the detected dog wins; the scene parent trails at 0.3
        assert_eq!(ranked[0].tag.name, "Animal");
        assert!(ranked
            .iter()
            .any(|s| s.tag.name == "Natural environment"));
        assert!(ranked[0].score > ranked[1].score);
    }

    /// The end-to-end flow: suggest, then create under the suggestion.
    #[tokio::test]
    async fn suggestion_feeds_creation() {
        let (h, admin) = seeded().await;

        let parent = h
            .classifier
            .suggest_parent("Siamese cat", Some("a breed of cat"), None)
            .await
            .unwrap()
            .expect("suggestion");

        let tag = h
            .engine
            .create(
                CreateTag::named("Siamese cat").under(parent.id),
                &admin,
                None,
            )
            .await
            .unwrap();

        assert_eq!(tag.path, "Everything/Animal/Siamese cat");
        assert_eq!(tag.level, 2);
    }

    #[tokio::test]
    async fn similar_tags_rank_by_similarity() {
        let (h, admin) = seeded().await;

        h.engine
            .create(CreateTag::named("Cats"), &admin, None)
            .await
            .unwrap();

        let similar = h.classifier.similar_tags("Cats", 5).await.unwrap();
        assert!(!similar.is_empty());
        assert_eq!(similar[0].tag.name, "Cats");
        assert!((similar[0].similarity - 1.0).abs() < f64::EPSILON);
    }
}
