//! Typed query model for the search index.
//!
//! The engine assembles queries in this model; each backend renders it into
//! its own wire form (the HTTP backend renders the Elasticsearch DSL, the
//! in-memory backend evaluates it directly).

use rust_decimal::Decimal;
use serde_json::Value;

use bazaar_core::ProductStatus;

/// A boolean query with filters, sort, and pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    /// Free-text query; `None` matches all documents.
    pub text: Option<String>,
    /// Conjunctive filters.
    pub filters: Vec<IndexFilter>,
    pub sort: IndexSort,
    /// Offset of the first hit.
    pub from: usize,
    /// Page size.
    pub size: usize,
}

impl IndexQuery {
    /// A match-all query with default paging.
    #[must_use]
    pub const fn match_all() -> Self {
        Self {
            text: None,
            filters: Vec::new(),
            sort: IndexSort::Relevance,
            from: 0,
            size: 20,
        }
    }
}

/// One conjunctive filter clause.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexFilter {
    /// Match documents whose id is in the list.
    Ids(Vec<String>),
    /// Exact match on a field.
    Term { field: String, value: Value },
    /// Field value must be one of the given values.
    Terms { field: String, values: Vec<Value> },
    /// Inclusive price range.
    PriceRange {
        min: Option<Decimal>,
        max: Option<Decimal>,
    },
    /// Stock strictly greater than zero.
    StockPositive,
    /// Nested attribute filter: key must match and the value must be in
    /// the given set.
    Attribute { key: String, values: Vec<String> },
}

/// Sort order for search hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexSort {
    /// Score-descending.
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    NewestFirst,
}

/// A scripted single-field mutation for update-by-query.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: String,
    pub value: Value,
}

impl FieldUpdate {
    /// Field update that sets the document status.
    #[must_use]
    pub fn status(status: ProductStatus) -> Self {
        Self {
            field: "status".to_owned(),
            value: Value::String(status.as_str().to_owned()),
        }
    }
}

/// One document in a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    pub id: String,
    pub document: Value,
}

/// A page of hits plus the total count across all pages.
#[derive(Debug, Clone, Default)]
pub struct SearchHits {
    pub hits: Vec<Value>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_field_update() {
        let update = FieldUpdate::status(ProductStatus::Deleted);
        assert_eq!(update.field, "status");
        assert_eq!(update.value, Value::String("DELETED".to_owned()));
    }

    #[test]
    fn test_match_all_defaults() {
        let query = IndexQuery::match_all();
        assert!(query.text.is_none());
        assert!(query.filters.is_empty());
        assert_eq!(query.sort, IndexSort::Relevance);
    }
}
