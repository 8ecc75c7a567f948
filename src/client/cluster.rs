//! # Kubernetes Client
//!
//! [`ResourceClient`] over a live cluster using `Api<DynamicObject>`.

use crate::client::{QueryOptions, ResourceClient};
use crate::error::ClientError;
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, PostParams};
use kube::core::ApiResource;
use kube::Client;
use serde_json::Value;
use tracing::debug;

/// Resource client backed by a `kube::Client`
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceClient")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeResourceClient {
    #[must_use]
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn api(&self, model: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, model)
    }

    fn post_params(&self, opts: &QueryOptions) -> PostParams {
        PostParams {
            dry_run: opts.dry_run,
            field_manager: Some(self.field_manager.clone()),
        }
    }
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn create(
        &self,
        model: &ApiResource,
        opts: &QueryOptions,
        body: Value,
    ) -> Result<Value, ClientError> {
        let obj = to_dynamic(body)?;
        debug!(
            kind = %model.kind,
            name = %opts.name,
            namespace = %opts.namespace,
            dry_run = opts.dry_run,
            "creating resource"
        );
        let created = self
            .api(model, &opts.namespace)
            .create(&self.post_params(opts), &obj)
            .await
            .map_err(|e| classify(e, ClientError::AlreadyExists))?;
        from_dynamic(&created)
    }

    async fn get(&self, model: &ApiResource, opts: &QueryOptions) -> Result<Value, ClientError> {
        let obj = self
            .api(model, &opts.namespace)
            .get(&opts.name)
            .await
            .map_err(|e| classify(e, ClientError::Conflict))?;
        from_dynamic(&obj)
    }

    async fn update(
        &self,
        model: &ApiResource,
        opts: &QueryOptions,
        body: Value,
    ) -> Result<Value, ClientError> {
        let obj = to_dynamic(body)?;
        debug!(
            kind = %model.kind,
            name = %opts.name,
            namespace = %opts.namespace,
            dry_run = opts.dry_run,
            "replacing resource"
        );
        let updated = self
            .api(model, &opts.namespace)
            .replace(&opts.name, &self.post_params(opts), &obj)
            .await
            .map_err(|e| classify(e, ClientError::Conflict))?;
        from_dynamic(&updated)
    }
}

fn to_dynamic(body: Value) -> Result<DynamicObject, ClientError> {
    serde_json::from_value(body).map_err(|e| ClientError::Invalid(e.to_string()))
}

fn from_dynamic(obj: &DynamicObject) -> Result<Value, ClientError> {
    serde_json::to_value(obj).map_err(|e| ClientError::Invalid(e.to_string()))
}

/// Map API server responses onto the client error taxonomy
///
/// A 409 means a name collision on create and a stale version on replace, so
/// the caller picks its meaning.
fn classify(err: kube::Error, on_conflict: fn(String) -> ClientError) -> ClientError {
    match err {
        kube::Error::Api(api_err) => match api_err.code {
            404 => ClientError::NotFound(api_err.message),
            409 => on_conflict(api_err.message),
            400 | 422 => ClientError::Invalid(api_err.message),
            _ => ClientError::Transport(format!("{} ({})", api_err.message, api_err.code)),
        },
        other => ClientError::Transport(other.to_string()),
    }
}
