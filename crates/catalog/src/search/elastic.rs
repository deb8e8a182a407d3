//! Elasticsearch-compatible HTTP backend for the search index.
//!
//! Talks plain REST + JSON via reqwest: `_doc` for upserts, `_update` for
//! partial updates, `_bulk` for batch writes, `_update_by_query` with a
//! painless script for scoped field mutations, `_search` for queries.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};

use super::documents::price_number;
use super::query::{BulkOperation, FieldUpdate, IndexFilter, IndexQuery, IndexSort, SearchHits};
use super::{SearchIndex, SearchIndexError};

/// HTTP client for an Elasticsearch-compatible search service.
#[derive(Clone)]
pub struct ElasticSearchIndex {
    client: reqwest::Client,
    base_url: String,
}

impl ElasticSearchIndex {
    /// Create a client for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, index: &str, path: &str) -> String {
        format!("{}/{index}/{path}", self.base_url)
    }

    async fn expect_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SearchIndexError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SearchIndexError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

fn transport(e: reqwest::Error) -> SearchIndexError {
    SearchIndexError::Transport(e.to_string())
}

#[async_trait]
impl SearchIndex for ElasticSearchIndex {
    async fn upsert(
        &self,
        index: &str,
        id: &str,
        document: Value,
    ) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .put(self.url(index, &format!("_doc/{id}")))
            .json(&document)
            .send()
            .await
            .map_err(transport)?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn partial_update(
        &self,
        index: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .post(self.url(index, &format!("_update/{id}")))
            .json(&json!({ "doc": fields }))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SearchIndexError::NotFound {
                index: index.to_owned(),
                id: id.to_owned(),
            });
        }
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        operations: Vec<BulkOperation>,
    ) -> Result<(), SearchIndexError> {
        if operations.is_empty() {
            return Ok(());
        }

        let mut body = String::new();
        for op in &operations {
            let action = json!({ "index": { "_index": index, "_id": op.id } });
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(&op.document)?);
            body.push('\n');
        }

        let response = self
            .client
            .post(format!("{}/_bulk", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(transport)?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn update_by_query(
        &self,
        index: &str,
        filter: IndexFilter,
        update: FieldUpdate,
    ) -> Result<u64, SearchIndexError> {
        let body = json!({
            "query": filter_to_dsl(&filter),
            "script": {
                "source": "ctx._source[params.field] = params.value",
                "lang": "painless",
                "params": { "field": update.field, "value": update.value },
            },
        });

        let response = self
            .client
            .post(self.url(index, "_update_by_query"))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let response = Self::expect_success(response).await?;

        let payload: Value = response.json().await.map_err(transport)?;
        Ok(payload
            .get("updated")
            .and_then(Value::as_u64)
            .unwrap_or_default())
    }

    async fn search(
        &self,
        index: &str,
        query: &IndexQuery,
    ) -> Result<SearchHits, SearchIndexError> {
        let response = self
            .client
            .post(self.url(index, "_search"))
            .json(&query_to_dsl(query))
            .send()
            .await
            .map_err(transport)?;
        let response = Self::expect_success(response).await?;

        let payload: Value = response.json().await.map_err(transport)?;
        let hits_obj = payload.get("hits").cloned().unwrap_or_default();

        // ES reports total as either a bare number or {"value": n}.
        let total = match hits_obj.get("total") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or_default(),
            Some(Value::Object(obj)) => obj
                .get("value")
                .and_then(Value::as_u64)
                .unwrap_or_default(),
            _ => 0,
        };

        let hits = hits_obj
            .get("hits")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|hit| hit.get("_source").cloned())
                    .collect()
            })
            .unwrap_or_default();

        Ok(SearchHits { hits, total })
    }
}

/// Render one filter clause into the ES query DSL.
fn filter_to_dsl(filter: &IndexFilter) -> Value {
    match filter {
        IndexFilter::Ids(ids) => json!({ "terms": { "_id": ids } }),
        IndexFilter::Term { field, value } => {
            let mut clause = serde_json::Map::new();
            clause.insert(field.clone(), value.clone());
            json!({ "term": clause })
        }
        IndexFilter::Terms { field, values } => {
            let mut clause = serde_json::Map::new();
            clause.insert(field.clone(), json!(values));
            json!({ "terms": clause })
        }
        IndexFilter::PriceRange { min, max } => {
            let mut range = serde_json::Map::new();
            if let Some(min) = min {
                range.insert("gte".to_owned(), json!(price_number(*min)));
            }
            if let Some(max) = max {
                range.insert("lte".to_owned(), json!(price_number(*max)));
            }
            json!({ "range": { "price": range } })
        }
        IndexFilter::StockPositive => json!({ "range": { "stock": { "gt": 0 } } }),
        IndexFilter::Attribute { key, values } => json!({
            "nested": {
                "path": "attributes",
                "query": {
                    "bool": {
                        "must": [
                            { "match": { "attributes.key": key } },
                            { "terms": { "attributes.value": values } },
                        ],
                    },
                },
            },
        }),
    }
}

/// Render a full query into the ES search body.
fn query_to_dsl(query: &IndexQuery) -> Value {
    let must = query.text.as_ref().map_or_else(
        || json!({ "match_all": {} }),
        |text| {
            json!({
                "multi_match": {
                    "query": text,
                    "fields": ["title^3", "description", "sku", "brandName", "categoryName"],
                    "fuzziness": "AUTO",
                },
            })
        },
    );

    let filters: Vec<Value> = query.filters.iter().map(filter_to_dsl).collect();

    let sort = match query.sort {
        IndexSort::Relevance => json!([{ "_score": "desc" }]),
        IndexSort::PriceAsc => json!([{ "price": "asc" }]),
        IndexSort::PriceDesc => json!([{ "price": "desc" }]),
        IndexSort::NewestFirst => json!([{ "createdAt": "desc" }]),
    };

    json!({
        "from": query.from,
        "size": query.size,
        "query": { "bool": { "must": [must], "filter": filters } },
        "sort": sort,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let index = ElasticSearchIndex::new("http://localhost:9200///");
        assert_eq!(
            index.url("product", "_doc/7"),
            "http://localhost:9200/product/_doc/7"
        );
    }

    #[test]
    fn test_match_all_when_no_text() {
        let dsl = query_to_dsl(&IndexQuery::match_all());
        assert_eq!(dsl["query"]["bool"]["must"][0], json!({ "match_all": {} }));
    }

    #[test]
    fn test_text_query_uses_fuzzy_multi_match() {
        let query = IndexQuery {
            text: Some("running shoe".to_owned()),
            ..IndexQuery::match_all()
        };
        let dsl = query_to_dsl(&query);
        let multi = &dsl["query"]["bool"]["must"][0]["multi_match"];
        assert_eq!(multi["query"], json!("running shoe"));
        assert_eq!(multi["fuzziness"], json!("AUTO"));
        assert_eq!(multi["fields"][0], json!("title^3"));
    }

    #[test]
    fn test_price_range_filter_dsl() {
        let dsl = filter_to_dsl(&IndexFilter::PriceRange {
            min: Some(Decimal::new(1000, 2)),
            max: None,
        });
        assert_eq!(dsl, json!({ "range": { "price": { "gte": 10.0 } } }));
    }

    #[test]
    fn test_attribute_filter_is_nested() {
        let dsl = filter_to_dsl(&IndexFilter::Attribute {
            key: "color".to_owned(),
            values: vec!["red".to_owned(), "blue".to_owned()],
        });
        assert_eq!(dsl["nested"]["path"], json!("attributes"));
        let must = &dsl["nested"]["query"]["bool"]["must"];
        assert_eq!(must[0], json!({ "match": { "attributes.key": "color" } }));
        assert_eq!(
            must[1],
            json!({ "terms": { "attributes.value": ["red", "blue"] } })
        );
    }

    #[test]
    fn test_ids_filter_targets_document_ids() {
        let dsl = filter_to_dsl(&IndexFilter::Ids(vec![
            "101-2".to_owned(),
            "101-3".to_owned(),
        ]));
        assert_eq!(dsl, json!({ "terms": { "_id": ["101-2", "101-3"] } }));
    }

    #[test]
    fn test_sort_rendering() {
        let mut query = IndexQuery::match_all();
        query.sort = IndexSort::PriceDesc;
        assert_eq!(query_to_dsl(&query)["sort"], json!([{ "price": "desc" }]));
        query.sort = IndexSort::NewestFirst;
        assert_eq!(
            query_to_dsl(&query)["sort"],
            json!([{ "createdAt": "desc" }])
        );
    }
}
