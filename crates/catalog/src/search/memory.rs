//! In-memory search index for tests.
//!
//! Stores raw documents per index, records every operation it receives, and
//! evaluates the same query model the HTTP backend renders into the ES DSL.
//! A failure toggle lets tests exercise the engine's projection error
//! policy.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::documents::price_number;
use super::query::{BulkOperation, FieldUpdate, IndexFilter, IndexQuery, IndexSort, SearchHits};
use super::{SearchIndex, SearchIndexError};

/// A record of one index operation, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOperation {
    Upsert {
        index: String,
        id: String,
    },
    PartialUpdate {
        index: String,
        id: String,
    },
    BulkUpsert {
        index: String,
        ids: Vec<String>,
    },
    UpdateByQuery {
        index: String,
        filter: IndexFilter,
        field: String,
    },
}

#[derive(Debug, Default)]
struct Inner {
    indices: HashMap<String, BTreeMap<String, Value>>,
    operations: Vec<RecordedOperation>,
    fail: bool,
}

/// In-memory search index.
#[derive(Debug, Clone, Default)]
pub struct InMemorySearchIndex {
    inner: Arc<RwLock<Inner>>,
}

impl InMemorySearchIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with a transport error.
    pub fn set_fail(&self, fail: bool) {
        self.lock_mut(|inner| inner.fail = fail);
    }

    /// All operations received so far, in order.
    #[must_use]
    pub fn operations(&self) -> Vec<RecordedOperation> {
        self.lock(|inner| inner.operations.clone())
    }

    /// Forget recorded operations (documents are kept).
    pub fn clear_operations(&self) {
        self.lock_mut(|inner| inner.operations.clear());
    }

    /// Fetch a stored document.
    #[must_use]
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.lock(|inner| inner.indices.get(index)?.get(id).cloned())
    }

    /// Number of documents in an index.
    #[must_use]
    pub fn doc_count(&self, index: &str) -> usize {
        self.lock(|inner| inner.indices.get(index).map_or(0, BTreeMap::len))
    }

    /// Seed a document directly, bypassing the operation log.
    pub fn seed(&self, index: &str, id: &str, document: Value) {
        self.lock_mut(|inner| {
            inner
                .indices
                .entry(index.to_owned())
                .or_default()
                .insert(id.to_owned(), document);
        });
    }

    fn lock<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    }

    fn lock_mut<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    fn fail_check(inner: &Inner) -> Result<(), SearchIndexError> {
        if inner.fail {
            Err(SearchIndexError::Transport("injected failure".to_owned()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn upsert(
        &self,
        index: &str,
        id: &str,
        document: Value,
    ) -> Result<(), SearchIndexError> {
        self.lock_mut(|inner| {
            Self::fail_check(inner)?;
            inner.operations.push(RecordedOperation::Upsert {
                index: index.to_owned(),
                id: id.to_owned(),
            });
            inner
                .indices
                .entry(index.to_owned())
                .or_default()
                .insert(id.to_owned(), document);
            Ok(())
        })
    }

    async fn partial_update(
        &self,
        index: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), SearchIndexError> {
        self.lock_mut(|inner| {
            Self::fail_check(inner)?;
            inner.operations.push(RecordedOperation::PartialUpdate {
                index: index.to_owned(),
                id: id.to_owned(),
            });

            let doc = inner
                .indices
                .get_mut(index)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| SearchIndexError::NotFound {
                    index: index.to_owned(),
                    id: id.to_owned(),
                })?;

            if let Value::Object(updates) = fields
                && let Value::Object(existing) = doc
            {
                for (key, value) in updates {
                    existing.insert(key, value);
                }
            }
            Ok(())
        })
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        operations: Vec<BulkOperation>,
    ) -> Result<(), SearchIndexError> {
        self.lock_mut(|inner| {
            Self::fail_check(inner)?;
            inner.operations.push(RecordedOperation::BulkUpsert {
                index: index.to_owned(),
                ids: operations.iter().map(|op| op.id.clone()).collect(),
            });
            let docs = inner.indices.entry(index.to_owned()).or_default();
            for op in operations {
                docs.insert(op.id, op.document);
            }
            Ok(())
        })
    }

    async fn update_by_query(
        &self,
        index: &str,
        filter: IndexFilter,
        update: FieldUpdate,
    ) -> Result<u64, SearchIndexError> {
        self.lock_mut(|inner| {
            Self::fail_check(inner)?;
            inner.operations.push(RecordedOperation::UpdateByQuery {
                index: index.to_owned(),
                filter: filter.clone(),
                field: update.field.clone(),
            });

            let mut touched = 0;
            if let Some(docs) = inner.indices.get_mut(index) {
                for (id, doc) in docs.iter_mut() {
                    if matches_filter(id, doc, &filter)
                        && let Value::Object(obj) = doc
                    {
                        obj.insert(update.field.clone(), update.value.clone());
                        touched += 1;
                    }
                }
            }
            Ok(touched)
        })
    }

    async fn search(
        &self,
        index: &str,
        query: &IndexQuery,
    ) -> Result<SearchHits, SearchIndexError> {
        self.lock(|inner| {
            Self::fail_check(inner)?;

            let mut matched: Vec<Value> = inner
                .indices
                .get(index)
                .map(|docs| {
                    docs.iter()
                        .filter(|(id, doc)| {
                            matches_text(doc, query.text.as_deref())
                                && query
                                    .filters
                                    .iter()
                                    .all(|filter| matches_filter(id, doc, filter))
                        })
                        .map(|(_, doc)| doc.clone())
                        .collect()
                })
                .unwrap_or_default();

            sort_hits(&mut matched, query.sort);

            let total = matched.len() as u64;
            let hits: Vec<Value> = matched
                .into_iter()
                .skip(query.from)
                .take(query.size)
                .collect();

            Ok(SearchHits { hits, total })
        })
    }
}

const TEXT_FIELDS: &[&str] = &["title", "description", "sku", "brandName", "categoryName"];

fn matches_text(doc: &Value, text: Option<&str>) -> bool {
    let Some(text) = text else { return true };
    let needle = text.to_lowercase();
    let terms: Vec<&str> = needle.split_whitespace().collect();
    if terms.is_empty() {
        return true;
    }

    TEXT_FIELDS.iter().any(|field| {
        doc.get(*field)
            .and_then(Value::as_str)
            .is_some_and(|haystack| {
                let haystack = haystack.to_lowercase();
                terms.iter().any(|term| haystack.contains(term))
            })
    })
}

fn matches_filter(id: &str, doc: &Value, filter: &IndexFilter) -> bool {
    match filter {
        IndexFilter::Ids(ids) => ids.iter().any(|candidate| candidate == id),
        IndexFilter::Term { field, value } => doc.get(field) == Some(value),
        IndexFilter::Terms { field, values } => doc
            .get(field)
            .is_some_and(|actual| values.iter().any(|value| value == actual)),
        IndexFilter::PriceRange { min, max } => {
            let Some(price) = doc.get("price").and_then(Value::as_f64) else {
                return false;
            };
            min.is_none_or(|min| price >= price_number(min))
                && max.is_none_or(|max| price <= price_number(max))
        }
        IndexFilter::StockPositive => doc
            .get("stock")
            .and_then(Value::as_i64)
            .is_some_and(|stock| stock > 0),
        IndexFilter::Attribute { key, values } => doc
            .get("attributes")
            .and_then(Value::as_array)
            .is_some_and(|entries| {
                entries.iter().any(|entry| {
                    entry.get("key").and_then(Value::as_str) == Some(key.as_str())
                        && entry
                            .get("value")
                            .and_then(Value::as_str)
                            .is_some_and(|value| values.iter().any(|v| v == value))
                })
            }),
    }
}

fn sort_hits(hits: &mut [Value], sort: IndexSort) {
    let price_of = |doc: &Value| doc.get("price").and_then(Value::as_f64).unwrap_or(0.0);
    match sort {
        // Insertion (id) order stands in for score order.
        IndexSort::Relevance => {}
        IndexSort::PriceAsc => {
            hits.sort_by(|a, b| price_of(a).total_cmp(&price_of(b)));
        }
        IndexSort::PriceDesc => {
            hits.sort_by(|a, b| price_of(b).total_cmp(&price_of(a)));
        }
        IndexSort::NewestFirst => {
            // createdAt is RFC 3339, which sorts lexicographically.
            hits.sort_by(|a, b| {
                let created = |doc: &Value| {
                    doc.get("createdAt")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_owned()
                };
                created(b).cmp(&created(a))
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_and_partial_update() {
        let index = InMemorySearchIndex::new();
        index
            .upsert("product", "1", json!({ "title": "Shoe", "status": "ACTIVE" }))
            .await
            .unwrap();

        index
            .partial_update("product", "1", json!({ "status": "DELETED" }))
            .await
            .unwrap();

        let doc = index.document("product", "1").unwrap();
        assert_eq!(doc["status"], json!("DELETED"));
        assert_eq!(doc["title"], json!("Shoe"));
    }

    #[tokio::test]
    async fn test_partial_update_missing_is_not_found() {
        let index = InMemorySearchIndex::new();
        let err = index
            .partial_update("product", "404", json!({ "status": "DELETED" }))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_by_query_counts_touched_docs() {
        let index = InMemorySearchIndex::new();
        index.seed("variants", "1-1", json!({ "productId": 1, "status": "ACTIVE" }));
        index.seed("variants", "1-2", json!({ "productId": 1, "status": "ACTIVE" }));
        index.seed("variants", "2-1", json!({ "productId": 2, "status": "ACTIVE" }));

        let touched = index
            .update_by_query(
                "variants",
                IndexFilter::Term {
                    field: "productId".to_owned(),
                    value: json!(1),
                },
                FieldUpdate {
                    field: "status".to_owned(),
                    value: json!("DELETED"),
                },
            )
            .await
            .unwrap();

        assert_eq!(touched, 2);
        assert_eq!(index.document("variants", "2-1").unwrap()["status"], json!("ACTIVE"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let index = InMemorySearchIndex::new();
        index.set_fail(true);
        let err = index.upsert("product", "1", json!({})).await.unwrap_err();
        assert!(matches!(err, SearchIndexError::Transport(_)));
    }

    #[tokio::test]
    async fn test_search_text_and_paging() {
        let index = InMemorySearchIndex::new();
        for i in 1..=5 {
            index.seed(
                "product",
                &i.to_string(),
                json!({ "title": format!("Shoe {i}"), "price": f64::from(i) }),
            );
        }
        index.seed("product", "9", json!({ "title": "Hat", "price": 9.0 }));

        let query = IndexQuery {
            text: Some("shoe".to_owned()),
            filters: Vec::new(),
            sort: IndexSort::Relevance,
            from: 2,
            size: 2,
        };
        let result = index.search("product", &query).await.unwrap();
        assert_eq!(result.total, 5);
        assert_eq!(result.hits.len(), 2);
    }
}
