//! Registry of SAML strategies, one per identity provider.
//!
//! Built once at startup from the `idps` table and immutable afterwards:
//!
//! ```rust,ignore
//! let registry = IdpRegistry::load(db.idps(), &config.server).await;
//!
//! if let Some(strategy) = registry.get("uni1") {
//!     let url = strategy.authorization_url(&relay_state)?;
//! }
//! ```

use std::{collections::HashMap, sync::Arc};

use super::saml::SamlStrategy;
use crate::{
    config::ServerConfig,
    db::{DbError, IdpRepo},
    models::Idp,
};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to load identity providers: {0}")]
    LoadError(String),

    #[error("Failed to create SAML strategy for IdP {code}: {message}")]
    StrategyCreation { code: String, message: String },
}

impl From<DbError> for RegistryError {
    fn from(e: DbError) -> Self {
        RegistryError::LoadError(e.to_string())
    }
}

/// IdP code to strategy. Lookups are unsynchronized reads.
#[derive(Debug, Default)]
pub struct IdpRegistry {
    strategies: HashMap<String, Arc<SamlStrategy>>,
}

impl IdpRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a strategy per IdP. A malformed IdP is logged and left out; it
    /// never prevents the others from registering.
    pub fn from_idps(idps: Vec<Idp>, server: &ServerConfig) -> Self {
        let mut strategies = HashMap::with_capacity(idps.len());

        for idp in idps {
            let code = idp.code.clone();
            match SamlStrategy::new(idp, server) {
                Ok(strategy) => {
                    tracing::debug!(idp_code = %code, "Registered SAML strategy");
                    strategies.insert(code, Arc::new(strategy));
                }
                Err(e) => {
                    let err = RegistryError::StrategyCreation {
                        code,
                        message: e.to_string(),
                    };
                    tracing::warn!(error = %err, "Skipping identity provider");
                }
            }
        }

        Self { strategies }
    }

    pub async fn initialize_from_db(
        repo: &dyn IdpRepo,
        server: &ServerConfig,
    ) -> Result<Self, RegistryError> {
        let idps = repo.list().await?;
        let registry = Self::from_idps(idps, server);
        tracing::info!(count = registry.len(), "Identity providers loaded");
        Ok(registry)
    }

    /// Like [`Self::initialize_from_db`], but a failed load yields an empty
    /// registry so the service still starts and serves public routes.
    pub async fn load(repo: &dyn IdpRepo, server: &ServerConfig) -> Self {
        match Self::initialize_from_db(repo, server).await {
            Ok(registry) => registry,
            Err(e) => {
                tracing::error!(error = %e, "Starting with no identity providers");
                Self::empty()
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<Arc<SamlStrategy>> {
        self.strategies.get(code).cloned()
    }

    /// Registered IdP codes, sorted.
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.strategies.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
