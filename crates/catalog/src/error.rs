//! Catalog error types.

use thiserror::Error;

use bazaar_core::ValidationError;

use crate::search::SearchIndexError;
use crate::store::RepositoryError;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Caller input failed field validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A caller contract violation (e.g. a scope missing its target id).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unique constraint violated; the payload names the field.
    #[error("this record already exists ({0})")]
    Conflict(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The bounded slug retry budget ran out without finding a free slug.
    #[error("slug could not be generated within the retry budget")]
    SlugGenerationExhausted,

    /// The search index failed in a way the engine does not swallow.
    #[error("search index error: {0}")]
    Search(#[from] SearchIndexError),

    /// Primary store failure. Always fatal to the calling operation.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(field) => Self::Conflict(field),
            RepositoryError::NotFound => Self::NotFound("no matching record".to_owned()),
            other => Self::Repository(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_conflict_maps_to_conflict() {
        let err = CatalogError::from(RepositoryError::Conflict("slug".to_owned()));
        assert!(matches!(err, CatalogError::Conflict(field) if field == "slug"));
    }

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let err = CatalogError::from(RepositoryError::NotFound);
        assert!(matches!(err, CatalogError::NotFound(_)));
    }
}
