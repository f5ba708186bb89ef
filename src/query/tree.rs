//! Tree assembly for the taxonomy's navigation surface.

use std::collections::HashMap;

use crate::{
    error::TaxonomyError,
    models::tag::{Tag, TagId},
    refs::ContentRefs,
    store::TagStore,
};

/// On-demand statistics attached to a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct TagStats {
    pub children_count: i64,
    pub usage_count: i64,
    pub total_descendants: i64,
}

/// One node of the rendered tree.
///
/// `children` is `None` when descent stopped at this node (depth cutoff or
/// shallow root listing) - serialization then omits the key entirely, which
/// is distinct from an empty list.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub tag: Tag,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TagStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

/// Builds the tree per the query engine's contract: subtree under a named
/// root, or all roots shallow.
pub(crate) async fn build(
    store: &TagStore,
    refs: &dyn ContentRefs,
    root_id: Option<TagId>,
    max_depth: u32,
    include_stats: bool,
) -> Result<Vec<TreeNode>, TaxonomyError> {
    match root_id {
        Some(id) => {
            let Some(root) = store.get_active(id).await? else {
                // a missing (or non-active) root is just an empty tree
                return Ok(vec![]);
            };

            let node = subtree(store, refs, root, max_depth, include_stats).await?;
            Ok(vec![node])
        }

        None => {
            let mut nodes = Vec::new();
            for root in store.active_roots().await? {
                let stats = if include_stats {
                    Some(stats_for(store, refs, &root).await?)
                } else {
                    None
                };

                nodes.push(TreeNode {
                    tag: root,
                    stats,
                    children: None,
                });
            }
            Ok(nodes)
        }
    }
}

/// Gathers a subtree breadth-first (so no async recursion), then assembles
/// the nested nodes synchronously.
async fn subtree(
    store: &TagStore,
    refs: &dyn ContentRefs,
    root: Tag,
    max_depth: u32,
    include_stats: bool,
) -> Result<TreeNode, TaxonomyError> {
    let mut children_of: HashMap<TagId, Vec<Tag>> = HashMap::new();
    let mut frontier = vec![(root.id, 0_u32)];

    while let Some((id, depth)) = frontier.pop() {
        if depth >= max_depth {
            continue;
        }

        let kids = store.active_children(id).await?;
        for kid in &kids {
            frontier.push((kid.id, depth + 1));
        }
        children_of.insert(id, kids);
    }

    let mut stats_of: HashMap<TagId, TagStats> = HashMap::new();
    if include_stats {
        stats_of.insert(root.id, stats_for(store, refs, &root).await?);

        let gathered: Vec<Tag> = children_of.values().flatten().cloned().collect();
        for tag in &gathered {
            let stats = stats_for(store, refs, tag).await?;
            stats_of.insert(tag.id, stats);
        }
    }

    Ok(assemble(root, max_depth, &mut children_of, &mut stats_of))
}

fn assemble(
    tag: Tag,
    depth_left: u32,
    children_of: &mut HashMap<TagId, Vec<Tag>>,
    stats_of: &mut HashMap<TagId, TagStats>,
) -> TreeNode {
    let children = if depth_left == 0 {
        None
    } else {
        let kids = children_of.remove(&tag.id).unwrap_or_default();
        Some(
            kids.into_iter()
                .map(|kid| assemble(kid, depth_left - 1, children_of, stats_of))
                .collect(),
        )
    };

    TreeNode {
        stats: stats_of.remove(&tag.id),
        tag,
        children,
    }
}

/// Computes a node's stats, refreshing the cached usage count from the live
/// content-reference count when they disagree.
async fn stats_for(
    store: &TagStore,
    refs: &dyn ContentRefs,
    tag: &Tag,
) -> Result<TagStats, TaxonomyError> {
    let children_count = store.active_children_count(tag.id).await?;

    let mut usage_count = tag.usage_count;
    if refs.is_authoritative() {
        let live = refs.count(tag.id).await?;
        if live != tag.usage_count {
            tracing::debug!(
                "usage count for `{}` was stale ({} cached, {live} live); refreshing",
                tag.name,
                tag.usage_count
            );
            store.set_usage(tag.id, live).await?;
        }
        usage_count = live;
    }

    let total_descendants = store.active_descendant_count(tag.id).await?;

    Ok(TagStats {
        children_count,
        usage_count,
        total_descendants,
    })
}
