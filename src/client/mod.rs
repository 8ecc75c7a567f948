//! # Resource Client
//!
//! The importer talks to the cluster through [`ResourceClient`], a small
//! create/get/update contract keyed by a model descriptor
//! ([`kube::core::ApiResource`]). Bodies travel as JSON so the trait stays
//! object-safe; [`Typed`] layers the CRD types from [`crate::crd`] on top.
//!
//! - `cluster.rs` - implementation over a live `kube::Client`
//! - `memory.rs` - in-memory implementation with scripted statuses

mod cluster;
mod memory;

pub use cluster::KubeResourceClient;
pub use memory::{InMemoryClient, RecordedCall, Verb};

use crate::error::ClientError;
use async_trait::async_trait;
use kube::core::ApiResource;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Identifies one object for a client call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub name: String,
    pub namespace: String,
    /// Validate against the API without persisting
    pub dry_run: bool,
}

impl QueryOptions {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            dry_run: false,
        }
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Create/get/update access to namespaced custom resources
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Create a resource; fails with `AlreadyExists` if the name is taken and
    /// `Invalid` if the body fails schema validation
    async fn create(
        &self,
        model: &ApiResource,
        opts: &QueryOptions,
        body: Value,
    ) -> Result<Value, ClientError>;

    /// Fetch a resource; fails with `NotFound`
    async fn get(&self, model: &ApiResource, opts: &QueryOptions) -> Result<Value, ClientError>;

    /// Replace a resource; the body must carry the resource version it was
    /// read at, and a stale version fails with `Conflict`
    async fn update(
        &self,
        model: &ApiResource,
        opts: &QueryOptions,
        body: Value,
    ) -> Result<Value, ClientError>;
}

/// Typed view over a [`ResourceClient`]
#[derive(Debug)]
pub struct Typed<'a, C: ?Sized>(pub &'a C);

impl<C> Typed<'_, C>
where
    C: ResourceClient + ?Sized,
{
    pub async fn create<K>(&self, resource: &K, dry_run: bool) -> Result<K, ClientError>
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
    {
        let opts = query_for(resource)?.dry_run(dry_run);
        let created = self
            .0
            .create(&crate::crd::model::<K>(), &opts, to_body(resource)?)
            .await?;
        from_body(created)
    }

    pub async fn get<K>(&self, name: &str, namespace: &str) -> Result<K, ClientError>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let opts = QueryOptions::new(name, namespace);
        from_body(self.0.get(&crate::crd::model::<K>(), &opts).await?)
    }

    pub async fn update<K>(&self, resource: &K, dry_run: bool) -> Result<K, ClientError>
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
    {
        let opts = query_for(resource)?.dry_run(dry_run);
        let updated = self
            .0
            .update(&crate::crd::model::<K>(), &opts, to_body(resource)?)
            .await?;
        from_body(updated)
    }
}

fn query_for<K: Resource>(resource: &K) -> Result<QueryOptions, ClientError> {
    let meta = resource.meta();
    let name = meta
        .name
        .clone()
        .ok_or_else(|| ClientError::Invalid("metadata.name is required".to_string()))?;
    let namespace = meta
        .namespace
        .clone()
        .ok_or_else(|| ClientError::Invalid("metadata.namespace is required".to_string()))?;
    Ok(QueryOptions::new(name, namespace))
}

fn to_body<K: Serialize>(resource: &K) -> Result<Value, ClientError> {
    serde_json::to_value(resource).map_err(|e| ClientError::Invalid(e.to_string()))
}

fn from_body<K: DeserializeOwned>(body: Value) -> Result<K, ClientError> {
    serde_json::from_value(body)
        .map_err(|e| ClientError::Invalid(format!("unexpected resource shape: {e}")))
}
