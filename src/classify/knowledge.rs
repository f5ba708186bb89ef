//! The classifier's lookup tables.
//!
//! Everything the auto-classifier knows lives in one explicit, versioned,
//! serde-loadable structure. Deployments swap it per locale through
//! [`crate::config::TaxonomyConfig`] instead of editing code.

use std::collections::BTreeMap;

/// One category bucket: a parent tag name plus the keywords that point at it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CategoryKeywords {
    /// Name of the existing parent tag this bucket nominates.
    pub parent: String,

    /// The `category` column value seeded parents get.
    pub category: String,

    #[serde(default)]
    pub is_abstract: bool,

    pub keywords: Vec<String>,
}

/// Scene/caption keywords mapping onto an environment parent.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneKeywords {
    pub parent: String,
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct KnowledgeBase {
    /// Bumped whenever the shipped tables change shape or content.
    pub version: u32,

    /// Name of the taxonomy's system root ("all things" lives under it).
    pub root_name: String,

    /// The parent tag nominated whenever a color token shows up.
    pub color_parent: String,

    pub colors: Vec<String>,

    /// Surface form -> canonical keyword (e.g. "kitty" -> "cat").
    pub synonyms: BTreeMap<String, String>,

    pub categories: Vec<CategoryKeywords>,

    pub scenes: Vec<SceneKeywords>,
}

impl KnowledgeBase {
    /// Canonical form of a (lowercased) term, if the dictionary knows it.
    pub fn canonical(&self, term: &str) -> Option<&str> {
        self.synonyms.get(term).map(String::as_str)
    }

    /// Category buckets whose keyword list contains `term` exactly.
    pub fn buckets_with_keyword<'a>(
        &'a self,
        term: &'a str,
    ) -> impl Iterator<Item = &'a CategoryKeywords> {
        self.categories
            .iter()
            .filter(move |c| c.keywords.iter().any(|k| k.as_str() == term))
    }

    /// Scene parents whose keywords appear as substrings of `text`.
    pub fn scene_parents<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> {
        self.scenes
            .iter()
            .filter(move |s| s.keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|s| s.parent.as_str())
    }

    /// Does the text mention any known color token?
    pub fn mentions_color(&self, text: &str) -> bool {
        self.colors.iter().any(|c| text.contains(c.as_str()))
    }

    /// Every parent name the tables can nominate, with its seeding category
    /// and abstractness. Drives [`crate::seed`].
    pub fn system_parents(&self) -> Vec<(String, String, bool)> {
        let mut parents: Vec<(String, String, bool)> = Vec::new();

        for cat in &self.categories {
            if !parents.iter().any(|(name, ..)| name == &cat.parent) {
                parents.push((cat.parent.clone(), cat.category.clone(), cat.is_abstract));
            }
        }

        for scene in &self.scenes {
            if !parents.iter().any(|(name, ..)| name == &scene.parent) {
                parents.push((scene.parent.clone(), "physical".into(), false));
            }
        }

        if !parents.iter().any(|(name, ..)| name == &self.color_parent) {
            parents.push((self.color_parent.clone(), "physical".into(), true));
        }

        parents
    }
}

impl Default for KnowledgeBase {
    /// The English tables shipped with the crate.
    fn default() -> Self {
        fn cat(parent: &str, category: &str, is_abstract: bool, kws: &[&str]) -> CategoryKeywords {
            CategoryKeywords {
                parent: parent.into(),
                category: category.into(),
                is_abstract,
                keywords: kws.iter().map(|s| s.to_string()).collect(),
            }
        }

        fn scene(parent: &str, kws: &[&str]) -> SceneKeywords {
            SceneKeywords {
                parent: parent.into(),
                keywords: kws.iter().map(|s| s.to_string()).collect(),
            }
        }

        let synonyms = [
            ("kitty", "cat"),
            ("feline", "cat"),
            ("puppy", "dog"),
            ("canine", "dog"),
            ("automobile", "car"),
            ("aeroplane", "airplane"),
            ("plane", "airplane"),
            ("bike", "bicycle"),
            ("blossom", "flower"),
            ("kid", "child"),
            ("infant", "baby"),
            ("cellphone", "phone"),
            ("smartphone", "phone"),
            ("laptop", "computer"),
            ("pc", "computer"),
            ("tv", "television"),
            ("ship", "boat"),
            ("home", "house"),
            ("pup", "dog"),
            ("steed", "horse"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            version: 1,
            root_name: "Everything".into(),
            color_parent: "Color".into(),
            colors: [
                "red", "blue", "green", "yellow", "purple", "orange", "pink", "brown", "black",
                "white", "gray", "grey",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            synonyms,
            categories: vec![
                cat(
                    "Animal",
                    "biological",
                    false,
                    &[
                        "animal", "mammal", "cat", "dog", "bird", "fish", "horse", "cow",
                        "elephant", "insect", "reptile", "amphibian",
                    ],
                ),
                cat(
                    "Plant",
                    "biological",
                    false,
                    &["plant", "flower", "tree", "grass", "fern", "algae", "fungus", "moss"],
                ),
                cat(
                    "Person",
                    "biological",
                    false,
                    &["person", "people", "man", "woman", "child", "baby", "crowd"],
                ),
                cat(
                    "Vehicle",
                    "artificial",
                    false,
                    &[
                        "vehicle", "car", "truck", "bus", "bicycle", "motorcycle", "airplane",
                        "boat", "train",
                    ],
                ),
                cat(
                    "Building",
                    "artificial",
                    false,
                    &["building", "house", "bridge", "tower", "monument", "church", "temple"],
                ),
                cat(
                    "Tool",
                    "artificial",
                    false,
                    &["tool", "machine", "device", "instrument", "apparatus", "equipment"],
                ),
                cat(
                    "Furniture",
                    "artificial",
                    false,
                    &["furniture", "chair", "table", "bed", "cabinet", "sofa", "desk"],
                ),
                cat(
                    "Food",
                    "artificial",
                    false,
                    &[
                        "food", "drink", "vegetable", "fruit", "meat", "seafood", "bread", "cake",
                    ],
                ),
                cat(
                    "Clothing",
                    "artificial",
                    false,
                    &["clothing", "clothes", "shoes", "hat", "jewelry", "dress", "coat"],
                ),
                cat(
                    "Electronics",
                    "artificial",
                    false,
                    &["computer", "phone", "television", "camera", "speaker", "screen", "robot"],
                ),
                cat(
                    "Weather",
                    "physical",
                    false,
                    &["weather", "cloud", "rain", "snow", "lightning", "wind", "frost", "storm"],
                ),
                cat(
                    "Landform",
                    "physical",
                    false,
                    &[
                        "mountain", "ocean", "lake", "river", "desert", "forest", "valley",
                        "island", "beach",
                    ],
                ),
                cat(
                    "Celestial body",
                    "physical",
                    false,
                    &["sun", "moon", "star", "planet", "galaxy", "comet", "sky"],
                ),
                cat(
                    "Material",
                    "physical",
                    false,
                    &["material", "metal", "wood", "stone", "plastic", "glass", "paper", "fabric"],
                ),
                cat(
                    "Chemical",
                    "physical",
                    false,
                    &["chemical", "compound", "element", "acid", "drug", "medicine"],
                ),
                cat(
                    "Emotion",
                    "psychological",
                    true,
                    &["emotion", "joy", "sadness", "anger", "fear", "love", "mood"],
                ),
                cat(
                    "Concept",
                    "psychological",
                    true,
                    &["concept", "idea", "philosophy", "religion", "culture", "theory"],
                ),
                cat(
                    "Activity",
                    "psychological",
                    true,
                    &["activity", "sport", "game", "work", "study", "entertainment", "travel"],
                ),
                cat(
                    "Art",
                    "psychological",
                    true,
                    &[
                        "art", "painting", "sculpture", "music", "dance", "literature", "film",
                    ],
                ),
            ],
            scenes: vec![
                scene("Natural environment", &["outdoor", "nature", "landscape", "wilderness"]),
                scene("Indoor environment", &["indoor", "room", "interior"]),
                scene("Urban environment", &["city", "street", "downtown"]),
                scene("Marine environment", &["ocean", "beach", "sea", "underwater"]),
                scene("Mountain environment", &["mountain", "forest", "alpine"]),
            ],
        }
    }
}
