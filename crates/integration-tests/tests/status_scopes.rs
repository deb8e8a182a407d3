//! Status-propagation scope map tests.

use serde_json::json;

use bazaar_catalog::engine::{StatusChange, StatusScope};
use bazaar_catalog::error::CatalogError;
use bazaar_catalog::search::{
    IndexFilter, PRODUCT_INDEX, RecordedOperation, VARIANT_INDEX,
};
use bazaar_core::{ProductId, ProductStatus, VariantId};
use bazaar_integration_tests::engine_harness;

fn change(scope: StatusScope) -> StatusChange {
    StatusChange {
        product_id: ProductId::new(101),
        status: ProductStatus::Deleted,
        scope,
        variant_id: None,
        variant_ids: None,
    }
}

#[tokio::test]
async fn test_variant_list_targets_exactly_the_named_documents() {
    let harness = engine_harness();

    harness
        .engine
        .change_status(StatusChange {
            variant_ids: Some(vec![VariantId::new(2), VariantId::new(3)]),
            ..change(StatusScope::VariantList)
        })
        .await
        .unwrap();

    // Exactly one index operation, targeting ids 101-2 and 101-3: no
    // product-document op, nothing for other variants.
    let ops = harness.index.operations();
    assert_eq!(ops.len(), 1);
    match ops.first().unwrap() {
        RecordedOperation::UpdateByQuery {
            index,
            filter,
            field,
        } => {
            assert_eq!(index, VARIANT_INDEX);
            assert_eq!(field, "status");
            assert_eq!(
                filter,
                &IndexFilter::Ids(vec!["101-2".to_owned(), "101-3".to_owned()])
            );
        }
        other => panic!("unexpected operation: {other:?}"),
    }
}

#[tokio::test]
async fn test_variant_list_updates_only_listed_documents() {
    let harness = engine_harness();
    harness
        .index
        .seed(VARIANT_INDEX, "101-2", json!({ "status": "ACTIVE" }));
    harness
        .index
        .seed(VARIANT_INDEX, "101-3", json!({ "status": "ACTIVE" }));
    harness
        .index
        .seed(VARIANT_INDEX, "101-4", json!({ "status": "ACTIVE" }));

    harness
        .engine
        .change_status(StatusChange {
            variant_ids: Some(vec![VariantId::new(2), VariantId::new(3)]),
            ..change(StatusScope::VariantList)
        })
        .await
        .unwrap();

    let status_of = |id: &str| harness.index.document(VARIANT_INDEX, id).unwrap()["status"].clone();
    assert_eq!(status_of("101-2"), json!("DELETED"));
    assert_eq!(status_of("101-3"), json!("DELETED"));
    assert_eq!(status_of("101-4"), json!("ACTIVE"));
}

#[tokio::test]
async fn test_variant_list_without_ids_issues_nothing() {
    let harness = engine_harness();

    harness
        .engine
        .change_status(change(StatusScope::VariantList))
        .await
        .unwrap();

    assert!(harness.index.operations().is_empty());
}

#[tokio::test]
async fn test_variant_single_requires_variant_id() {
    let harness = engine_harness();

    let err = harness
        .engine
        .change_status(change(StatusScope::VariantSingle))
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::InvalidRequest(_)));
    assert!(harness.index.operations().is_empty());
}

#[tokio::test]
async fn test_variant_single_targets_composite_id() {
    let harness = engine_harness();
    harness
        .index
        .seed(VARIANT_INDEX, "101-7", json!({ "status": "ACTIVE" }));

    harness
        .engine
        .change_status(StatusChange {
            variant_id: Some(VariantId::new(7)),
            ..change(StatusScope::VariantSingle)
        })
        .await
        .unwrap();

    let ops = harness.index.operations();
    assert!(matches!(
        ops.as_slice(),
        [RecordedOperation::PartialUpdate { index, id }]
            if index == VARIANT_INDEX && id == "101-7"
    ));
    assert_eq!(
        harness.index.document(VARIANT_INDEX, "101-7").unwrap()["status"],
        json!("DELETED")
    );
}

#[tokio::test]
async fn test_variant_single_tolerates_missing_document() {
    let harness = engine_harness();

    // No document seeded: the missing-document condition is a warning, not
    // an error.
    harness
        .engine
        .change_status(StatusChange {
            variant_id: Some(VariantId::new(7)),
            ..change(StatusScope::VariantSingle)
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_product_only_touches_one_document() {
    let harness = engine_harness();
    harness
        .index
        .seed(PRODUCT_INDEX, "101", json!({ "status": "ACTIVE" }));

    harness
        .engine
        .change_status(change(StatusScope::ProductOnly))
        .await
        .unwrap();

    let ops = harness.index.operations();
    assert!(matches!(
        ops.as_slice(),
        [RecordedOperation::PartialUpdate { index, id }]
            if index == PRODUCT_INDEX && id == "101"
    ));
}

#[tokio::test]
async fn test_product_with_variants_issues_both_operations() {
    let harness = engine_harness();

    harness
        .engine
        .change_status(change(StatusScope::ProductWithVariants))
        .await
        .unwrap();

    let ops = harness.index.operations();
    assert_eq!(ops.len(), 2);
    assert!(matches!(
        ops.first().unwrap(),
        RecordedOperation::PartialUpdate { index, .. } if index == PRODUCT_INDEX
    ));
    let expected_filter = IndexFilter::Term {
        field: "productId".to_owned(),
        value: json!(101),
    };
    assert!(matches!(
        ops.get(1).unwrap(),
        RecordedOperation::UpdateByQuery { index, filter, .. }
            if index == VARIANT_INDEX && *filter == expected_filter
    ));
}

#[tokio::test]
async fn test_variants_by_product_skips_product_document() {
    let harness = engine_harness();

    harness
        .engine
        .change_status(change(StatusScope::VariantsByProduct))
        .await
        .unwrap();

    let ops = harness.index.operations();
    assert_eq!(ops.len(), 1);
    assert!(matches!(
        ops.first().unwrap(),
        RecordedOperation::UpdateByQuery { index, .. } if index == VARIANT_INDEX
    ));
}
