//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use bazaar_accounts::cache::MokaTokenCache;
use bazaar_accounts::issuer::CredentialIssuer;
use bazaar_accounts::saga::ProvisioningSaga;
use bazaar_accounts::store::PgAccountStore;
use bazaar_catalog::engine::CatalogEngine;
use bazaar_catalog::search::ElasticSearchIndex;
use bazaar_catalog::store::PgCatalogStore;

use crate::config::ApiConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// two orchestrators and the configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    saga: ProvisioningSaga<PgAccountStore, MokaTokenCache>,
    catalog: CatalogEngine<PgCatalogStore, ElasticSearchIndex>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let issuer = CredentialIssuer::new(
            config.access_token_secret.clone(),
            config.refresh_token_secret.clone(),
        );
        let saga = ProvisioningSaga::new(
            Arc::new(PgAccountStore::new(pool.clone())),
            Arc::new(MokaTokenCache::new()),
            issuer,
        );
        let catalog = CatalogEngine::new(
            Arc::new(PgCatalogStore::new(pool)),
            Arc::new(ElasticSearchIndex::new(config.search_url.clone())),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                saga,
                catalog,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the provisioning saga.
    #[must_use]
    pub fn saga(&self) -> &ProvisioningSaga<PgAccountStore, MokaTokenCache> {
        &self.inner.saga
    }

    /// Get a reference to the catalog engine.
    #[must_use]
    pub fn catalog(&self) -> &CatalogEngine<PgCatalogStore, ElasticSearchIndex> {
        &self.inner.catalog
    }
}
