//! Search behavior: boolean query assembly, filters, sorts, and paging.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde_json::json;

use bazaar_catalog::error::CatalogError;
use bazaar_catalog::models::{SearchCriteria, SortOption};
use bazaar_integration_tests::{engine_harness, product_spec, variant_spec, EngineHarness};

/// Seed a few products through the engine so the index holds real
/// projections.
async fn seeded_harness() -> EngineHarness {
    let harness = engine_harness();

    let brand = harness.store.register_brand("Northwind");
    let category = harness.store.register_category("Shoes");

    let mut runner = product_spec("Trail Runner");
    runner.price = Decimal::new(12999, 2);
    runner.brand_id = Some(brand);
    runner.category_id = Some(category);
    let mut attrs = BTreeMap::new();
    attrs.insert("color".to_owned(), json!("red"));
    attrs.insert("size".to_owned(), json!("42mm"));
    let mut variant = variant_spec("TR-42", 3);
    variant.attributes = attrs;
    runner.variants = vec![variant];
    harness.engine.create_product(runner).await.unwrap();

    let mut sandal = product_spec("Beach Sandal");
    sandal.price = Decimal::new(1999, 2);
    sandal.stock = 0;
    harness.engine.create_product(sandal).await.unwrap();

    let mut boot = product_spec("Winter Boot");
    boot.price = Decimal::new(19999, 2);
    harness.engine.create_product(boot).await.unwrap();

    harness
}

#[tokio::test]
async fn test_text_search_matches_title() {
    let harness = seeded_harness().await;

    let page = harness
        .engine
        .search(SearchCriteria {
            query: Some("runner".to_owned()),
            ..SearchCriteria::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.hits.first().unwrap()["title"], json!("Trail Runner"));
}

#[tokio::test]
async fn test_empty_query_matches_all() {
    let harness = seeded_harness().await;

    let page = harness
        .engine
        .search(SearchCriteria::default())
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.page, 1);
    assert_eq!(page.pages, 1);
}

#[tokio::test]
async fn test_price_range_filter() {
    let harness = seeded_harness().await;

    let page = harness
        .engine
        .search(SearchCriteria {
            min_price: Some(Decimal::new(10000, 2)),
            max_price: Some(Decimal::new(15000, 2)),
            ..SearchCriteria::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.hits.first().unwrap()["title"], json!("Trail Runner"));
}

#[tokio::test]
async fn test_in_stock_filter() {
    let harness = seeded_harness().await;

    let page = harness
        .engine
        .search(SearchCriteria {
            in_stock: true,
            ..SearchCriteria::default()
        })
        .await
        .unwrap();

    // The zero-stock sandal is filtered out.
    assert_eq!(page.total, 2);
    assert!(
        page.hits
            .iter()
            .all(|hit| hit["title"] != json!("Beach Sandal"))
    );
}

#[tokio::test]
async fn test_brand_filter() {
    let harness = seeded_harness().await;

    let brand_id = harness
        .engine
        .get_by_slug("trail-runner")
        .await
        .unwrap()
        .brand
        .unwrap()
        .id;

    let page = harness
        .engine
        .search(SearchCriteria {
            brand_ids: vec![brand_id],
            ..SearchCriteria::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_price_sorts() {
    let harness = seeded_harness().await;

    let asc = harness
        .engine
        .search(SearchCriteria {
            sort: SortOption::PriceAsc,
            ..SearchCriteria::default()
        })
        .await
        .unwrap();
    assert_eq!(asc.hits.first().unwrap()["title"], json!("Beach Sandal"));

    let desc = harness
        .engine
        .search(SearchCriteria {
            sort: SortOption::PriceDesc,
            ..SearchCriteria::default()
        })
        .await
        .unwrap();
    assert_eq!(desc.hits.first().unwrap()["title"], json!("Winter Boot"));
}

#[tokio::test]
async fn test_paging_math() {
    let harness = seeded_harness().await;

    let page = harness
        .engine
        .search(SearchCriteria {
            limit: 2,
            page: 2,
            ..SearchCriteria::default()
        })
        .await
        .unwrap();

    // 3 hits, limit 2: pages = ceil(3/2) = 2, second page holds the rest.
    assert_eq!(page.total, 3);
    assert_eq!(page.page, 2);
    assert_eq!(page.pages, 2);
    assert_eq!(page.hits.len(), 1);
}

#[tokio::test]
async fn test_zero_page_rejected() {
    let harness = seeded_harness().await;

    let err = harness
        .engine
        .search(SearchCriteria {
            page: 0,
            ..SearchCriteria::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Validation(_)));
}

#[tokio::test]
async fn test_search_never_touches_the_store() {
    let harness = seeded_harness().await;
    let before = harness.store.product_count();

    harness
        .engine
        .search(SearchCriteria::default())
        .await
        .unwrap();

    // Read-only delegation: the store is unchanged and unconsulted.
    assert_eq!(harness.store.product_count(), before);
}
