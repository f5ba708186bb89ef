use camino::Utf8Path;

use crate::{classify::knowledge::KnowledgeBase, error::ConfigError};

/// Tunables for the taxonomy engine.
///
/// Constructed once at bootstrap and passed into the engines explicitly.
/// Deployments that want locale-specific classifier tables or different
/// limits load this from a TOML file with [`TaxonomyConfig::from_disk`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    /// Upper bound on tag name length, in characters.
    pub max_name_len: usize,

    /// Quality score a user-created tag starts with.
    pub default_quality_score: f64,

    /// Quality score seeded system tags get (the root itself gets 10.0).
    pub system_quality_score: f64,

    /// Default result cap for keyword search.
    pub default_search_limit: u64,

    /// Default result cap for name-prefix suggestions.
    pub default_suggestion_limit: u64,

    /// Default result cap for per-tag history listings.
    pub default_history_limit: u64,

    /// The auto-classifier's lookup tables.
    pub knowledge: KnowledgeBase,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            max_name_len: 100,
            default_quality_score: 5.0,
            system_quality_score: 8.0,
            default_search_limit: 20,
            default_suggestion_limit: 10,
            default_history_limit: 50,
            knowledge: KnowledgeBase::default(),
        }
    }
}

impl TaxonomyConfig {
    /// Attempts to read a config from disk.
    ///
    /// Missing fields fall back to their defaults, so a deployment can ship
    /// a file that only overrides, say, the knowledge tables.
    pub async fn from_disk(path: &Utf8Path) -> Result<Self, ConfigError> {
        // read the config from disk
        let s = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::ReadFailed)?;

        // parse with `toml` crate
        let conf: Self = toml::from_str(s.as_str()).map_err(ConfigError::ParseFailed)?;
        Ok(conf)
    }
}
