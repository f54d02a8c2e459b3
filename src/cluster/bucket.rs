//! Bucket and scope handles
//!
//! Buckets and scopes are thin namespacing layers over the bucket's
//! connection pools; only `Collection` issues wire traffic.

use std::sync::Arc;

use crate::cluster::ClusterCtx;
use crate::cluster::collection::Collection;
use crate::pool::KvConnectionProvider;
use crate::types::{BucketName, CollectionName, ScopeName, ValidationError};

/// A handle to one bucket and its per-node connection pools
#[derive(Debug, Clone)]
pub struct Bucket {
    ctx: Arc<ClusterCtx>,
    providers: Arc<Vec<KvConnectionProvider>>,
    name: BucketName,
}

impl Bucket {
    pub(crate) fn new(
        ctx: Arc<ClusterCtx>,
        providers: Arc<Vec<KvConnectionProvider>>,
        name: BucketName,
    ) -> Self {
        Self {
            ctx,
            providers,
            name,
        }
    }

    /// The bucket name
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Open a scope within this bucket
    ///
    /// # Errors
    ///
    /// Returns an error if the scope name is empty.
    pub fn scope(&self, name: &str) -> Result<Scope, ValidationError> {
        Ok(Scope {
            ctx: Arc::clone(&self.ctx),
            providers: Arc::clone(&self.providers),
            bucket: self.name.clone(),
            name: ScopeName::new(name.to_string())?,
        })
    }

    /// The default scope of this bucket
    #[must_use]
    pub fn default_scope(&self) -> Scope {
        Scope {
            ctx: Arc::clone(&self.ctx),
            providers: Arc::clone(&self.providers),
            bucket: self.name.clone(),
            name: ScopeName::default_scope(),
        }
    }

    /// The default collection of the default scope
    #[must_use]
    pub fn default_collection(&self) -> Collection {
        Collection::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.providers),
            self.name.clone(),
            ScopeName::default_scope(),
            CollectionName::default_collection(),
        )
    }

    /// Per-node pool statuses for this bucket
    #[must_use]
    pub fn pool_statuses(&self) -> Vec<crate::pool::PoolStatus> {
        use crate::pool::ConnectionSource;
        self.providers.iter().map(|p| p.status()).collect()
    }
}

/// A handle to one scope within a bucket
#[derive(Debug, Clone)]
pub struct Scope {
    ctx: Arc<ClusterCtx>,
    providers: Arc<Vec<KvConnectionProvider>>,
    bucket: BucketName,
    name: ScopeName,
}

impl Scope {
    /// The scope name
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Open a collection within this scope
    ///
    /// # Errors
    ///
    /// Returns an error if the collection name is empty.
    pub fn collection(&self, name: &str) -> Result<Collection, ValidationError> {
        Ok(Collection::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.providers),
            self.bucket.clone(),
            self.name.clone(),
            CollectionName::new(name.to_string())?,
        ))
    }
}
