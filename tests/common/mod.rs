//! The parent of the other tests.
//!
//! Mostly to import the setup stuff below.

use std::{env::temp_dir, sync::Arc};

use camino::Utf8PathBuf;
use canopy::{
    classify::AutoClassifier,
    config::TaxonomyConfig,
    database::{self, Db},
    hierarchy::HierarchyEngine,
    query::TaxonomyQueryEngine,
    refs::EntryTaggings,
    store::TagStore,
};
use uuid::Uuid;

/// Everything a test could want, wired over one throwaway database.
#[allow(dead_code, reason = "it's used in the other tests")]
pub struct Harness {
    pub pool: Db,
    pub store: TagStore,
    pub refs: Arc<EntryTaggings>,
    pub engine: HierarchyEngine,
    pub queries: TaxonomyQueryEngine,
    pub classifier: AutoClassifier,
}

/// call this at the top of any new test func! :)
#[allow(dead_code, reason = "it's used in the other tests")]
pub async fn setup() -> Harness {
    // a fresh on-disk database per test, so tests can't see each other
    let db_dir = Utf8PathBuf::try_from(temp_dir())
        .unwrap()
        .join(format!("canopy-test-{}", Uuid::new_v4()));

    tokio::fs::create_dir_all(&db_dir)
        .await
        .expect("create db temp dir");

    let pool = database::connect(&db_dir.join("taxonomy.sqlite"))
        .await
        .expect("connect + migrate");

    let store = TagStore::new(pool.clone());
    let refs = Arc::new(EntryTaggings::new(pool.clone()));
    let config = TaxonomyConfig::default();

    Harness {
        engine: HierarchyEngine::new(store.clone(), refs.clone(), config.clone()),
        queries: TaxonomyQueryEngine::new(store.clone(), refs.clone(), config.clone()),
        classifier: AutoClassifier::new(store.clone(), config),
        pool,
        store,
        refs,
    }
}
