//! Shared fixtures for Bazaar integration tests.
//!
//! The tests exercise the provisioning saga and the catalog engine
//! end-to-end over the in-memory store, cache, and index implementations,
//! with no external services required.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;

use bazaar_accounts::cache::MokaTokenCache;
use bazaar_accounts::issuer::CredentialIssuer;
use bazaar_accounts::models::RegisterInput;
use bazaar_accounts::saga::ProvisioningSaga;
use bazaar_accounts::store::InMemoryAccountStore;
use bazaar_catalog::engine::CatalogEngine;
use bazaar_catalog::models::{NewProduct, NewVariant};
use bazaar_catalog::search::InMemorySearchIndex;
use bazaar_catalog::store::InMemoryCatalogStore;

/// A saga wired to fresh in-memory collaborators.
pub struct SagaHarness {
    pub store: Arc<InMemoryAccountStore>,
    pub cache: Arc<MokaTokenCache>,
    pub saga: ProvisioningSaga<InMemoryAccountStore, MokaTokenCache>,
}

/// Build a saga over an in-memory store and a moka cache.
#[must_use]
pub fn saga_harness() -> SagaHarness {
    let store = Arc::new(InMemoryAccountStore::new());
    let cache = Arc::new(MokaTokenCache::new());
    let saga = ProvisioningSaga::new(Arc::clone(&store), Arc::clone(&cache), test_issuer());
    SagaHarness { store, cache, saga }
}

/// An issuer with fixed test secrets.
#[must_use]
pub fn test_issuer() -> CredentialIssuer {
    CredentialIssuer::new(
        SecretString::from("integration-access-secret-0123456789"),
        SecretString::from("integration-refresh-secret-9876543210"),
    )
}

/// An engine wired to fresh in-memory collaborators.
pub struct EngineHarness {
    pub store: Arc<InMemoryCatalogStore>,
    pub index: Arc<InMemorySearchIndex>,
    pub engine: CatalogEngine<InMemoryCatalogStore, InMemorySearchIndex>,
}

/// Build a catalog engine over an in-memory store and index.
#[must_use]
pub fn engine_harness() -> EngineHarness {
    let store = Arc::new(InMemoryCatalogStore::new());
    let index = Arc::new(InMemorySearchIndex::new());
    let engine = CatalogEngine::new(Arc::clone(&store), Arc::clone(&index));
    EngineHarness {
        store,
        index,
        engine,
    }
}

/// A registration payload with a unique email/phone pair per `n`.
#[must_use]
pub fn register_input(n: u32) -> RegisterInput {
    RegisterInput {
        email: format!("shopper{n}@example.com"),
        phone: format!("+9055512{n:05}"),
        password: "correct-horse".to_owned(),
        first_name: "Test".to_owned(),
        last_name: "Shopper".to_owned(),
    }
}

/// A minimal product spec.
#[must_use]
pub fn product_spec(title: &str) -> NewProduct {
    NewProduct {
        title: title.to_owned(),
        description: format!("{title} description"),
        price: Decimal::new(4999, 2),
        stock: 10,
        sku: None,
        images: Vec::new(),
        brand_id: None,
        category_id: None,
        tag_ids: Vec::new(),
        variants: Vec::new(),
    }
}

/// A variant spec with the given sku and stock.
#[must_use]
pub fn variant_spec(sku: &str, stock: i32) -> NewVariant {
    NewVariant {
        sku: sku.to_owned(),
        price: None,
        stock,
        attributes: std::collections::BTreeMap::new(),
        barcode: None,
    }
}

/// Poll until `check` passes or the timeout elapses, yielding to spawned
/// tasks in between. Used to observe fire-and-forget compensation.
pub async fn wait_until(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
