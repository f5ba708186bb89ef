//! Heuristic auto-classification of new tags into the hierarchy.
//!
//! Given a candidate tag name (plus optional description and recognition
//! context), the classifier nominates parent names from four independent
//! signal sources, resolves them against existing active tags, and scores
//! the survivors. No trained model, no external calls - every suggestion is
//! explainable from the knowledge tables.

use std::collections::HashMap;

use crate::{
    config::TaxonomyConfig,
    error::TaxonomyError,
    models::tag::{Tag, TagId},
    store::TagStore,
};

pub mod knowledge;
mod similarity;

/// A tag name matched an object keyword exactly (possibly after synonym
/// canonicalization).
const NAME_DIRECT_CONFIDENCE: f64 = 0.9;
/// A tag name matched a keyword by substring or fuzzy similarity.
const NAME_FUZZY_CONFIDENCE: f64 = 0.7;
/// A category keyword appeared inside the free-text description.
const DESCRIPTION_CONFIDENCE: f64 = 0.5;
/// A color token appeared anywhere.
const COLOR_CONFIDENCE: f64 = 0.8;
/// A scene keyword appeared in the recognition caption.
const SCENE_CONFIDENCE: f64 = 0.3;

/// Minimum normalized similarity for a fuzzy keyword hit.
const FUZZY_THRESHOLD: f64 = 0.8;
/// Minimum similarity for the similar-name suggestions.
const SIMILAR_THRESHOLD: f64 = 0.6;

/// One object detected by the external recognition model.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectedObject {
    pub label: String,
    /// Model confidence, 0-1.
    pub confidence: f64,
}

/// Externally-produced structured description of an image. The classifier
/// makes no assumption about how it was produced.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecognitionContext {
    pub objects: Vec<DetectedObject>,
    /// Scene caption.
    pub description: Option<String>,
    pub colors: Vec<String>,
}

/// A resolved candidate parent with its final score.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredParent {
    pub score: f64,
    pub tag: Tag,
}

/// An existing tag whose name resembles a proposed one.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarTag {
    pub similarity: f64,
    pub tag: Tag,
}

pub struct AutoClassifier {
    store: TagStore,
    config: TaxonomyConfig,
}

impl AutoClassifier {
    pub fn new(store: TagStore, config: TaxonomyConfig) -> Self {
        Self { store, config }
    }

    /// The best existing parent for a new tag, or `None` when no signal
    /// resolves to an existing active tag (the caller's fallback is to
    /// create the tag as a new root).
    #[tracing::instrument(skip(self, description, context))]
    pub async fn suggest_parent(
        &self,
        name: &str,
        description: Option<&str>,
        context: Option<&RecognitionContext>,
    ) -> Result<Option<Tag>, TaxonomyError> {
        let ranked = self.rank(name, description, context).await?;
        Ok(ranked.into_iter().next().map(|s| s.tag))
    }

    /// All resolved candidate parents, best first.
    ///
    /// When several signal sources nominate the same tag, its score is the
    /// *maximum* of their contributions, never the sum - the signals are
    /// evidence for one hypothesis, not additive votes. Ties break on name
    /// so results stay reproducible.
    pub async fn rank(
        &self,
        name: &str,
        description: Option<&str>,
        context: Option<&RecognitionContext>,
    ) -> Result<Vec<ScoredParent>, TaxonomyError> {
        let candidates = self.gather(name, description, context);
        tracing::debug!("gathered {} raw candidate(s) for `{name}`", candidates.len());

        // resolve each nominated name at most once
        let mut resolved: HashMap<String, Option<Tag>> = HashMap::new();
        let mut best: HashMap<TagId, ScoredParent> = HashMap::new();

        for (parent_name, confidence) in candidates {
            if !resolved.contains_key(&parent_name) {
                let fetched = self.store.get_active_by_name(&parent_name).await?;
                resolved.insert(parent_name.clone(), fetched);
            }

            // candidates with no existing tag behind them are discarded
            let Some(tag) = resolved.get(&parent_name).and_then(|t| t.clone()) else {
                continue;
            };

            let usage_boost = (1.0 + tag.usage_count as f64 / 100.0).min(1.2);
            let quality_factor = tag.quality_score / 10.0;
            let score = confidence * usage_boost * quality_factor;

            best.entry(tag.id)
                .and_modify(|entry| entry.score = entry.score.max(score))
                .or_insert(ScoredParent { score, tag });
        }

        let mut ranked: Vec<ScoredParent> = best.into_values().collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(core::cmp::Ordering::Equal)
                .then_with(|| a.tag.name.cmp(&b.tag.name))
        });

        Ok(ranked)
    }

    /// Existing active tags whose names resemble `name`, most similar first.
    pub async fn similar_tags(
        &self,
        name: &str,
        limit: u64,
    ) -> Result<Vec<SimilarTag>, TaxonomyError> {
        let name_lower = name.to_lowercase();
        let hits = self.store.name_contains(name, limit * 2).await?;

        let mut scored: Vec<SimilarTag> = hits
            .into_iter()
            .filter_map(|tag| {
                let similarity = similarity::ratio(&name_lower, &tag.name.to_lowercase());
                (similarity > SIMILAR_THRESHOLD).then_some(SimilarTag { similarity, tag })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(core::cmp::Ordering::Equal)
                .then_with(|| a.tag.name.cmp(&b.tag.name))
        });
        scored.truncate(limit as usize);

        Ok(scored)
    }

    /// Enumerates `(parent name, confidence)` nominations from the four
    /// signal sources. Source order carries no meaning - only the max
    /// survives scoring.
    fn gather(
        &self,
        name: &str,
        description: Option<&str>,
        context: Option<&RecognitionContext>,
    ) -> Vec<(String, f64)> {
        let kb = &self.config.knowledge;
        let mut candidates: Vec<(String, f64)> = Vec::new();

        let name_lower = name.to_lowercase();
        let canonical_name = kb.canonical(&name_lower).unwrap_or(name_lower.as_str());

        // 1. recognition context: detected objects at their own confidence,
        //    scene caption keywords at a low fixed one
        if let Some(ctx) = context {
            for obj in &ctx.objects {
                let label = obj.label.to_lowercase();
                let canonical = kb.canonical(&label).unwrap_or(label.as_str());

                for bucket in kb.buckets_with_keyword(canonical) {
                    candidates.push((bucket.parent.clone(), obj.confidence.clamp(0.0, 1.0)));
                }
            }

            if let Some(caption) = &ctx.description {
                for parent in kb.scene_parents(&caption.to_lowercase()) {
                    candidates.push((parent.to_string(), SCENE_CONFIDENCE));
                }
            }
        }

        // 2. the name itself: exact keyword hit (after canonicalization)
        //    beats a substring/fuzzy one
        for bucket in &kb.categories {
            let mut confidence: Option<f64> = None;

            for keyword in &bucket.keywords {
                if keyword.as_str() == canonical_name {
                    confidence = Some(NAME_DIRECT_CONFIDENCE);
                    break;
                }

                if name_lower.contains(keyword.as_str())
                    || similarity::ratio(&name_lower, keyword) >= FUZZY_THRESHOLD
                {
                    confidence = Some(confidence.unwrap_or(NAME_FUZZY_CONFIDENCE));
                }
            }

            if let Some(confidence) = confidence {
                candidates.push((bucket.parent.clone(), confidence));
            }
        }

        // 3. description keywords
        if let Some(desc) = description {
            let desc_lower = desc.to_lowercase();
            for bucket in &kb.categories {
                if bucket.keywords.iter().any(|k| desc_lower.contains(k.as_str())) {
                    candidates.push((bucket.parent.clone(), DESCRIPTION_CONFIDENCE));
                }
            }
        }

        // 4. color tokens, from any of the three inputs
        let color_hit = kb.mentions_color(&name_lower)
            || description.is_some_and(|d| kb.mentions_color(&d.to_lowercase()))
            || context.is_some_and(|c| {
                c.colors
                    .iter()
                    .any(|color| kb.colors.contains(&color.to_lowercase()))
            });

        if color_hit {
            candidates.push((kb.color_parent.clone(), COLOR_CONFIDENCE));
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;

    async fn classifier() -> AutoClassifier {
        let pool = database::connect_in_memory().await.unwrap();
        AutoClassifier::new(TagStore::new(pool), TaxonomyConfig::default())
    }

    fn confidence_for<'a>(candidates: &'a [(String, f64)], parent: &str) -> Option<f64> {
        candidates
            .iter()
            .filter(|(name, _)| name == parent)
            .map(|(_, c)| *c)
            .fold(None, |acc, c| Some(acc.map_or(c, |a: f64| a.max(c))))
    }

    #[tokio::test]
    async fn synonyms_hit_at_direct_confidence() {
        let c = classifier().await;

        let candidates = c.gather("Kitty", None, None);
        assert_eq!(confidence_for(&candidates, "Animal"), Some(0.9));
    }

    #[tokio::test]
    async fn substring_names_hit_at_fuzzy_confidence() {
        let c = classifier().await;

        // "persian cat" contains the "cat" keyword, but isn't it
        let candidates = c.gather("Persian cat", None, None);
        assert_eq!(confidence_for(&candidates, "Animal"), Some(0.7));
    }

    #[tokio::test]
    async fn descriptions_nominate_at_half_confidence() {
        let c = classifier().await;

        let candidates = c.gather("Rose", Some("a thorny flower"), None);
        assert_eq!(confidence_for(&candidates, "Plant"), Some(0.5));
    }

    #[tokio::test]
    async fn colors_nominate_the_color_parent() {
        let c = classifier().await;

        let candidates = c.gather("Crimson red", None, None);
        assert_eq!(confidence_for(&candidates, "Color"), Some(0.8));

        let ctx = RecognitionContext {
            objects: vec![],
            description: None,
            colors: vec!["Blue".into()],
        };
        let candidates = c.gather("Something", None, Some(&ctx));
        assert_eq!(confidence_for(&candidates, "Color"), Some(0.8));
    }

    #[tokio::test]
    async fn context_objects_carry_their_own_confidence() {
        let c = classifier().await;

        let ctx = RecognitionContext {
            objects: vec![DetectedObject {
                label: "dog".into(),
                confidence: 0.42,
            }],
            description: Some("an outdoor scene".into()),
            colors: vec![],
        };

        let candidates = c.gather("Buddy", None, Some(&ctx));
        assert_eq!(confidence_for(&candidates, "Animal"), Some(0.42));
        assert_eq!(
            confidence_for(&candidates, "Natural environment"),
            Some(SCENE_CONFIDENCE)
        );
    }
}
