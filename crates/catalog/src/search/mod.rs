//! Search index collaborator.
//!
//! The engine talks to the index through the [`SearchIndex`] trait. The
//! production backend is an Elasticsearch-compatible REST service; the
//! in-memory backend evaluates the same query model for tests.
//!
//! Index layout: product documents live in [`PRODUCT_INDEX`] keyed by
//! product id; variant documents live in [`VARIANT_INDEX`] keyed by the
//! composite `{productId}-{variantId}`.

pub mod documents;
pub mod elastic;
pub mod memory;
pub mod query;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use bazaar_core::{ProductId, VariantId};

pub use self::elastic::ElasticSearchIndex;
pub use self::memory::{InMemorySearchIndex, RecordedOperation};
pub use self::query::{BulkOperation, FieldUpdate, IndexFilter, IndexQuery, IndexSort, SearchHits};

/// Name of the product document index.
pub const PRODUCT_INDEX: &str = "product";

/// Name of the variant document index.
pub const VARIANT_INDEX: &str = "variants";

/// Composite document id for a variant.
#[must_use]
pub fn variant_doc_id(product_id: ProductId, variant_id: VariantId) -> String {
    format!("{product_id}-{variant_id}")
}

/// Errors from the search index.
#[derive(Debug, Error)]
pub enum SearchIndexError {
    /// The targeted document does not exist. Non-fatal to update-path
    /// projections: the index self-heals on the next full write.
    #[error("document not found: {index}/{id}")]
    NotFound { index: String, id: String },

    /// The index is unreachable or timed out.
    #[error("search index transport error: {0}")]
    Transport(String),

    /// The index rejected the request.
    #[error("search index rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// A payload failed to serialize or a response failed to parse.
    #[error("search index serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchIndexError {
    /// Whether this error is a missing-document condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A document store supporting upsert, partial update, bulk writes,
/// update-by-query, and boolean search.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or fully replace a document.
    async fn upsert(&self, index: &str, id: &str, document: Value)
    -> Result<(), SearchIndexError>;

    /// Merge fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns `SearchIndexError::NotFound` when the document does not
    /// exist; callers decide whether that is fatal.
    async fn partial_update(
        &self,
        index: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), SearchIndexError>;

    /// Write a batch of documents in one request.
    async fn bulk_upsert(
        &self,
        index: &str,
        operations: Vec<BulkOperation>,
    ) -> Result<(), SearchIndexError>;

    /// Apply a single-field mutation to every document matching the filter,
    /// without enumerating ids. Returns the number of documents touched.
    async fn update_by_query(
        &self,
        index: &str,
        filter: IndexFilter,
        update: FieldUpdate,
    ) -> Result<u64, SearchIndexError>;

    /// Run a boolean query and return a page of raw documents plus the
    /// total hit count.
    async fn search(&self, index: &str, query: &IndexQuery)
    -> Result<SearchHits, SearchIndexError>;
}
