use pisserror::Error;
use std::error::Error;

use crate::models::tag::{TagId, TagStatus};

/// The stable, machine-readable side of a [`TaxonomyError`].
///
/// Callers (usually an API layer) translate these into transport status
/// codes. The human-readable message rides along via `Display`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Permission,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("A tag name cannot be empty.")]
    EmptyName,

    #[error("The tag name `{name}` is {len} characters long, over the {max} character bound.")]
    NameTooLong { name: String, len: usize, max: usize },

    #[error("An active tag named `{name}` already exists.")]
    NameTaken { name: String },

    #[error("Moving tag `{tag_id}` under `{new_parent_id}` would create a cycle.")]
    CycleDetected {
        tag_id: TagId,
        new_parent_id: TagId,
    },

    #[error("A tag cannot be merged into itself. (id: `{_0}`)")]
    MergeSelf(TagId),

    #[error("A tag with status `{from}` cannot transition to `{to}`.")]
    InvalidStatusTransition { from: TagStatus, to: TagStatus },

    #[error("Bad input: {_0}")]
    BadInput(String),

    #[error("No tag with id `{_0}` was found.")]
    TagNotFound(TagId),

    #[error("No active parent tag with id `{_0}` was found.")]
    ParentNotFound(TagId),

    #[error("The tag with id `{id}` is not active. (status: `{status}`)")]
    TagNotActive { id: TagId, status: TagStatus },

    #[error("User `{actor_id}` lacks the `{capability}` capability.")]
    PermissionDenied {
        actor_id: uuid::Uuid,
        capability: &'static str,
    },

    #[error("The tag still has {count} active child tag(s). Move or delete them first.")]
    HasActiveChildren { count: i64 },

    #[error("The tag is still referenced by {count} content item(s) and cannot be deleted.")]
    ReferencedByContent { count: i64 },

    #[error("The taxonomy store has encountered an error. See: `{_0}`")]
    Database(#[from] DatabaseError),
}

impl TaxonomyError {
    /// Maps each error onto its stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyName
            | Self::NameTooLong { .. }
            | Self::NameTaken { .. }
            | Self::CycleDetected { .. }
            | Self::MergeSelf(_)
            | Self::InvalidStatusTransition { .. }
            | Self::BadInput(_) => ErrorKind::Validation,

            Self::TagNotFound(_) | Self::ParentNotFound(_) | Self::TagNotActive { .. } => {
                ErrorKind::NotFound
            }

            Self::PermissionDenied { .. } => ErrorKind::Permission,

            Self::HasActiveChildren { .. } | Self::ReferencedByContent { .. } => {
                ErrorKind::Conflict
            }

            Self::Database(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for TaxonomyError {
    fn from(value: sqlx::Error) -> Self {
        Self::Database(DatabaseError::GeneralDatabaseError(value))
    }
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("General database error. See: {_0}")]
    GeneralDatabaseError(#[from] sqlx::Error),

    #[error("Failed to connect to the database. See: {_0}")]
    ConnectionError(String),

    #[error("Connected to the database, but migrating it failed! See: {_0}")]
    MigrationFailed(sqlx::migrate::MigrateError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// during fs read from disk
    #[error("Failed to read config file. See: `{_0}`")]
    ReadFailed(#[from] tokio::io::Error),

    /// parsing
    #[error("Failed to parse config file. See: `{_0}`")]
    ParseFailed(#[from] toml::de::Error),
}
