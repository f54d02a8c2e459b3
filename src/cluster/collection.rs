//! Collection handles and key-value operations
//!
//! A `Collection` is a cheap-to-clone handle that resolves each operation to
//! the connection pool of the node owning the key, leases a connection and an
//! operation builder, and runs the request/response exchange under the
//! configured key-value timeout.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::cluster::ClusterCtx;
use crate::error::KvError;
use crate::pool::KvConnectionProvider;
use crate::protocol::{self, OpCode, Request, Response};
use crate::types::{BucketName, CollectionName, ScopeName};

/// Result of a successful get operation
#[derive(Debug, Clone)]
pub struct GetResult {
    value: Vec<u8>,
    flags: u32,
    cas: u64,
}

impl GetResult {
    /// The document content
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Consume the result, returning the document content
    #[must_use]
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Application-defined format flags stored with the document
    #[must_use]
    #[inline]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// The document's current CAS value
    #[must_use]
    #[inline]
    pub fn cas(&self) -> u64 {
        self.cas
    }
}

/// Result of a successful mutation (upsert/remove)
#[derive(Debug, Clone, Copy)]
pub struct MutationResult {
    cas: u64,
}

impl MutationResult {
    /// The document's CAS value after the mutation
    #[must_use]
    #[inline]
    pub fn cas(&self) -> u64 {
        self.cas
    }
}

/// A handle to one collection within a bucket and scope
#[derive(Debug, Clone)]
pub struct Collection {
    ctx: Arc<ClusterCtx>,
    providers: Arc<Vec<KvConnectionProvider>>,
    bucket: BucketName,
    scope: ScopeName,
    name: CollectionName,
    /// "scope.collection" route carried in request extras
    route: Vec<u8>,
    /// "bucket.scope.collection" path used for metrics
    metrics_path: String,
}

impl Collection {
    pub(crate) fn new(
        ctx: Arc<ClusterCtx>,
        providers: Arc<Vec<KvConnectionProvider>>,
        bucket: BucketName,
        scope: ScopeName,
        name: CollectionName,
    ) -> Self {
        let route = format!("{}.{}", scope, name).into_bytes();
        let metrics_path = format!("{}.{}.{}", bucket, scope, name);
        Self {
            ctx,
            providers,
            bucket,
            scope,
            name,
            route,
            metrics_path,
        }
    }

    /// The collection name
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The scope this collection belongs to
    #[must_use]
    pub fn scope_name(&self) -> &str {
        self.scope.as_str()
    }

    /// The bucket this collection belongs to
    #[must_use]
    pub fn bucket_name(&self) -> &str {
        self.bucket.as_str()
    }

    /// Fetch a document by key
    ///
    /// # Errors
    ///
    /// Returns [`KvError::KeyNotFound`] if the document does not exist, or a
    /// connectivity/timeout error if the node cannot be reached in time.
    pub async fn get(&self, key: &str) -> Result<GetResult, KvError> {
        let response = self
            .execute(OpCode::Get, key, &self.route, &[])
            .await?;

        let flags = match response.extras() {
            extras if extras.len() >= 4 => {
                u32::from_be_bytes([extras[0], extras[1], extras[2], extras[3]])
            }
            _ => 0,
        };

        Ok(GetResult {
            flags,
            cas: response.header.cas,
            value: response.value_to_vec(),
        })
    }

    /// Create or replace a document
    ///
    /// # Errors
    ///
    /// Returns an error if the value exceeds the server limit or the node
    /// cannot be reached in time.
    pub async fn upsert(&self, key: &str, value: &[u8]) -> Result<MutationResult, KvError> {
        self.upsert_with_flags(key, value, 0, 0).await
    }

    /// Create or replace a document with format flags and an expiry
    ///
    /// An `expiry_secs` of 0 means the document never expires.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Collection::upsert`].
    pub async fn upsert_with_flags(
        &self,
        key: &str,
        value: &[u8],
        flags: u32,
        expiry_secs: u32,
    ) -> Result<MutationResult, KvError> {
        // Upsert extras are the fixed flags/expiry fields followed by the
        // collection route
        let fixed = protocol::upsert_extras(flags, expiry_secs);
        let mut extras = Vec::with_capacity(fixed.len() + self.route.len());
        extras.extend_from_slice(&fixed);
        extras.extend_from_slice(&self.route);

        let response = self.execute(OpCode::Upsert, key, &extras, value).await?;
        Ok(MutationResult {
            cas: response.header.cas,
        })
    }

    /// Delete a document by key
    ///
    /// # Errors
    ///
    /// Returns [`KvError::KeyNotFound`] if the document does not exist.
    pub async fn remove(&self, key: &str) -> Result<MutationResult, KvError> {
        let response = self.execute(OpCode::Remove, key, &self.route, &[]).await?;
        Ok(MutationResult {
            cas: response.header.cas,
        })
    }

    /// Check whether a document exists
    ///
    /// # Errors
    ///
    /// Propagates connectivity and timeout errors; a missing document is
    /// `Ok(false)`, not an error.
    pub async fn exists(&self, key: &str) -> Result<bool, KvError> {
        match self.execute(OpCode::Get, key, &self.route, &[]).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_key_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run one request/response exchange against the node owning `key`
    async fn execute(
        &self,
        opcode: OpCode,
        key: &str,
        extras: &[u8],
        value: &[u8],
    ) -> Result<Response, KvError> {
        let node = self.ctx.router.node_for_key(key.as_bytes());
        let provider = &self.providers[node.as_index()];
        let opaque = self.ctx.next_opaque();

        let request = Request {
            opcode,
            partition: 0,
            opaque,
            cas: 0,
            extras,
            key: key.as_bytes(),
            value,
        };
        let request_len = request.encoded_len();

        if self.ctx.observability.tracing {
            debug!(
                collection = %self.metrics_path,
                op = %opcode,
                key_len = key.len(),
                value_len = value.len(),
                node = %node,
                "Dispatching operation"
            );
        }

        let started = Instant::now();
        let budget = self.ctx.timeouts.key_value;

        // If the timeout fires mid-exchange the leased connection is dropped
        // with a response still in flight; the pool's recycle peek sees the
        // unread bytes and discards that connection instead of reusing it.
        let exchange = async {
            let mut conn = provider.acquire().await?;

            let mut builder = self.ctx.builders.rent(request_len);
            request.encode_into(&mut builder)?;
            conn.write_all(&builder).await?;
            drop(builder);

            let response = protocol::read_response(&mut *conn, self.ctx.builders.rent(256)).await?;
            Ok::<Response, KvError>(response)
        };

        let result = match tokio::time::timeout(budget, exchange).await {
            Ok(result) => result,
            Err(_) => Err(KvError::Timeout {
                operation: opcode.name(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        };

        match result {
            Ok(response) => {
                if response.header.opaque != opaque {
                    self.ctx.metrics.record_error(node);
                    return Err(KvError::Protocol {
                        detail: format!(
                            "response desynchronized: sent opaque {}, got {}",
                            opaque, response.header.opaque
                        ),
                    });
                }

                if !response.header.status.is_success() {
                    let err = KvError::from_status(response.header.status, key.as_bytes());
                    // Missing documents are ordinary outcomes, not node errors
                    if !err.is_key_not_found() {
                        self.ctx.metrics.record_error(node);
                    }
                    return Err(err);
                }

                self.ctx.metrics.record_operation(
                    node,
                    &self.metrics_path,
                    request_len as u64,
                    (protocol::HEADER_LEN as u64) + u64::from(response.header.body_len),
                );
                Ok(response)
            }
            Err(e) => {
                self.ctx.metrics.record_error(node);
                Err(e)
            }
        }
    }
}
