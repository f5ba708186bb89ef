//! Keeps `level` and `path` consistent with the parent chain.
//!
//! The parent pointer is the source of truth; everything here derives from
//! it. Only `create` (once) and `move` (cascading) call in - external
//! callers never touch paths directly.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{error::DatabaseError, models::tag::Tag};

pub(crate) struct PathResolver;

impl PathResolver {
    /// Derives `(level, path)` for a tag named `name` under `parent`.
    pub(crate) fn derive(parent: Option<&Tag>, name: &str) -> (i64, String) {
        match parent {
            Some(p) => (p.level + 1, format!("{}/{name}", p.path)),
            None => (0, name.to_string()),
        }
    }

    /// Recomputes `level` and `path` for every transitive descendant of a
    /// tag whose own row was already updated to (`root_level`, `root_path`).
    ///
    /// Breadth-first, one level of the subtree per round trip, so a huge
    /// subtree never turns into one giant recursive statement. Each child
    /// only reads its immediate parent's already-updated values, which keeps
    /// the operation idempotent and order-independent.
    ///
    /// Returns how many descendants were touched.
    pub(crate) async fn cascade(
        conn: &mut SqliteConnection,
        root_id: Uuid,
        root_level: i64,
        root_path: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let mut touched = 0_u64;

        // (id, level, path) of tags whose children still need recomputing
        let mut frontier: Vec<(Uuid, i64, String)> =
            vec![(root_id, root_level, root_path.to_string())];

        while let Some((parent_id, parent_level, parent_path)) = frontier.pop() {
            let children = sqlx::query_as::<_, (Uuid, String)>(
                "SELECT id, name FROM tags WHERE parent_id = $1",
            )
            .bind(parent_id)
            .fetch_all(&mut *conn)
            .await?;

            for (child_id, child_name) in children {
                let level = parent_level + 1;
                let path = format!("{parent_path}/{child_name}");

                sqlx::query(
                    "UPDATE tags SET level = $2, path = $3, updated_at = $4 WHERE id = $1",
                )
                .bind(child_id)
                .bind(level)
                .bind(path.as_str())
                .bind(now)
                .execute(&mut *conn)
                .await?;

                touched += 1;
                frontier.push((child_id, level, path));
            }
        }

        if touched > 0 {
            tracing::debug!("path cascade touched {touched} descendant(s)");
        }

        Ok(touched)
    }
}
