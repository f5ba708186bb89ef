/*! # `canopy`

The tag taxonomy engine behind a collaborative "encyclopedia of everything"
backend.

## Purpose

Users tag content entries, and the tags themselves form a curated
hierarchical taxonomy meant to eventually classify all things. `canopy` owns
that taxonomy: a consistent, navigable, mutable tree of tags with full change
history and heuristic auto-classification of new tags into the hierarchy.

It's a library-level contract with no transport attached - sit it behind
HTTP, gRPC, or an in-process call as you like. Authentication, rate limiting,
entry storage, and the image-recognition model live elsewhere and are only
consumed through narrow seams ([`models::Actor`] capabilities,
[`refs::ContentRefs`], [`classify::RecognitionContext`]).

## What's inside

- Hierarchy operations with real invariants
    - [x] create / move / merge / soft-delete, all history-recorded
    - [x] no-cycle enforcement via bounded ancestor walks
    - [x] materialized path + level caches, cascaded on move
    - [x] status state machine (merged/deleted are terminal)
- Read side
    - [x] tree traversal with on-demand stats
    - [x] keyword search, prefix suggestions, popularity, categories
- Auto-classification
    - [x] four weighted signal sources, max-not-sum aggregation
    - [x] swappable per-locale knowledge tables
    - [x] similar-name suggestions

## Quick start

```no_run
use std::sync::Arc;

use canopy::{
    config::TaxonomyConfig,
    hierarchy::{CreateTag, HierarchyEngine},
    models::Actor,
    query::TaxonomyQueryEngine,
    refs::EntryTaggings,
    store::TagStore,
};

# async fn demo() -> Result<(), Box<dyn std::error::Error>> {
let pool = canopy::database::connect(camino::Utf8Path::new("taxonomy.sqlite")).await?;
let store = TagStore::new(pool.clone());
let refs = Arc::new(EntryTaggings::new(pool));
let config = TaxonomyConfig::default();

let engine = HierarchyEngine::new(store.clone(), refs.clone(), config.clone());
let queries = TaxonomyQueryEngine::new(store, refs, config);

let actor = Actor::contributor(uuid::Uuid::new_v4());
let animal = engine.create(CreateTag::named("Animal"), &actor, None).await?;
let cat = engine
    .create(CreateTag::named("Cat").under(animal.id), &actor, None)
    .await?;
assert_eq!(cat.path, "Animal/Cat");

let hits = queries.search("cat", None, None, None).await?;
assert_eq!(hits.len(), 1);
# Ok(())
# }
```
*/

pub mod classify;
pub mod config;
pub mod database;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod query;
pub mod refs;
pub mod seed;
pub mod store;
