//! # Access Binding Provisioner
//!
//! Requests git credentials for a repository through an SPIAccessTokenBinding
//! and waits until the secret has been injected.

use crate::client::{ResourceClient, Typed};
use crate::constants::{BASIC_AUTH_SECRET_TYPE, BINDING_NAME_PREFIX, REPOSITORY_PERMISSION_AREA};
use crate::crd::{
    BindingPhase, Permission, PermissionType, Permissions, SPIAccessTokenBinding,
    SPIAccessTokenBindingSpec, SecretTemplate,
};
use crate::error::{ImportError, OperationError};
use crate::naming::{generated_name, SuffixGenerator};
use crate::poller::{poll_until, PollSettings};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Build the binding requested for `git_url`
///
/// The injected secret shares the binding's name.
#[must_use]
pub fn access_token_binding(name: &str, namespace: &str, git_url: &str) -> SPIAccessTokenBinding {
    let mut binding = SPIAccessTokenBinding::new(
        name,
        SPIAccessTokenBindingSpec {
            repo_url: git_url.to_string(),
            permissions: Permissions {
                required: vec![
                    Permission {
                        r#type: PermissionType::Read,
                        area: REPOSITORY_PERMISSION_AREA.to_string(),
                    },
                    Permission {
                        r#type: PermissionType::Write,
                        area: REPOSITORY_PERMISSION_AREA.to_string(),
                    },
                ],
            },
            secret: SecretTemplate {
                name: name.to_string(),
                r#type: BASIC_AUTH_SECRET_TYPE.to_string(),
            },
        },
    );
    binding.metadata.namespace = Some(namespace.to_string());
    binding
}

/// Name of the secret holding the injected credentials
///
/// Prefers the object the binding reports as synced over the requested name.
#[must_use]
pub fn secret_name_for(binding: &SPIAccessTokenBinding) -> String {
    binding
        .status
        .as_ref()
        .and_then(|s| s.synced_object_ref.as_ref())
        .map(|r| r.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| binding.spec.secret.name.clone())
}

fn phase_of(binding: &SPIAccessTokenBinding) -> BindingPhase {
    binding.status.as_ref().map(|s| s.phase).unwrap_or_default()
}

/// Creates access-token bindings and waits for injection
#[derive(Debug)]
pub struct BindingProvisioner<'a, C: ?Sized> {
    client: &'a C,
    suffixes: &'a dyn SuffixGenerator,
    poll: PollSettings,
}

impl<'a, C> BindingProvisioner<'a, C>
where
    C: ResourceClient + ?Sized,
{
    pub fn new(client: &'a C, suffixes: &'a dyn SuffixGenerator, poll: PollSettings) -> Self {
        Self {
            client,
            suffixes,
            poll,
        }
    }

    /// Provision a binding for `git_url` unless `secret_name` already names usable credentials
    ///
    /// Returns `None` without touching the cluster when a secret is supplied.
    /// On failure the created binding is left in place for inspection.
    pub async fn provision(
        &self,
        git_url: &str,
        namespace: &str,
        secret_name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<SPIAccessTokenBinding>, OperationError> {
        if let Some(secret) = secret_name.filter(|s| !s.trim().is_empty()) {
            debug!(secret = %secret, "secret supplied, skipping access token binding");
            return Ok(None);
        }
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled.into());
        }

        let name = generated_name(BINDING_NAME_PREFIX, &self.suffixes.next_suffix());
        let typed = Typed(self.client);
        let created = typed
            .create(&access_token_binding(&name, namespace, git_url), false)
            .await?;
        info!(binding = %name, repo = %git_url, "created access token binding");

        // The create response is the first status checked
        let mut seed = Some(created);
        let typed = &typed;
        let name_ref = name.as_str();
        let result = poll_until(
            move || {
                let seeded = seed.take();
                async move {
                    match seeded {
                        Some(binding) => Ok(binding),
                        None => typed.get::<SPIAccessTokenBinding>(name_ref, namespace).await,
                    }
                }
            },
            |b| phase_of(b) == BindingPhase::Injected,
            |b| phase_of(b).is_failure(),
            &self.poll,
            cancel,
        )
        .await;

        match result {
            Ok(binding) => {
                info!(
                    binding = %name,
                    secret = %secret_name_for(&binding),
                    "access token binding injected"
                );
                Ok(Some(binding))
            }
            Err(err) => {
                warn!(binding = %name, "access token binding did not become ready");
                Err(err.into_operation_error(|b| {
                    let status = b.status.clone().unwrap_or_default();
                    ImportError::Provisioning {
                        phase: status.phase.as_str().to_string(),
                        message: status
                            .error_message
                            .unwrap_or_else(|| "no error message reported".to_string()),
                    }
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InMemoryClient, Verb};
    use crate::naming::SequentialSuffix;
    use serde_json::json;
    use std::time::Duration;

    const REPO: &str = "https://github.com/test/repository";

    fn poll() -> PollSettings {
        PollSettings::new(Duration::from_secs(1), Duration::from_secs(5))
    }

    #[test]
    fn test_binding_body() {
        let binding = access_token_binding("appstudio-import-abc", "test-ns", REPO);
        let body = serde_json::to_value(binding).unwrap();
        assert_eq!(
            body,
            json!({
                "apiVersion": "appstudio.redhat.com/v1beta1",
                "kind": "SPIAccessTokenBinding",
                "metadata": {"name": "appstudio-import-abc", "namespace": "test-ns"},
                "spec": {
                    "repoUrl": REPO,
                    "permissions": {
                        "required": [
                            {"type": "r", "area": "repository"},
                            {"type": "w", "area": "repository"}
                        ]
                    },
                    "secret": {"name": "appstudio-import-abc", "type": "kubernetes.io/basic-auth"}
                }
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_when_secret_supplied() {
        let client = InMemoryClient::new();
        let suffixes = SequentialSuffix::new();
        let provisioner = BindingProvisioner::new(&client, &suffixes, poll());

        let result = provisioner
            .provision(REPO, "test-ns", Some("git-creds"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_injection() {
        let client = InMemoryClient::new();
        client.script_statuses(
            "SPIAccessTokenBinding",
            vec![
                json!({"phase": "Pending"}),
                json!({"phase": "Pending"}),
                json!({"phase": "Injected", "syncedObjectRef": {"name": "synced-secret"}}),
            ],
        );
        let suffixes = SequentialSuffix::new();
        let provisioner = BindingProvisioner::new(&client, &suffixes, poll());

        let binding = provisioner
            .provision(REPO, "test-ns", None, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(binding.metadata.name.as_deref(), Some("appstudio-import-000001"));
        assert_eq!(secret_name_for(&binding), "synced-secret");
        assert_eq!(client.calls_for(Verb::Create, "SPIAccessTokenBinding").len(), 1);
        assert_eq!(client.calls_for(Verb::Get, "SPIAccessTokenBinding").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_on_create_needs_no_polling() {
        let client = InMemoryClient::new();
        client.script_statuses("SPIAccessTokenBinding", vec![json!({"phase": "Injected"})]);
        let suffixes = SequentialSuffix::new();
        let provisioner = BindingProvisioner::new(&client, &suffixes, poll());

        let binding = provisioner
            .provision(REPO, "test-ns", Some(""), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(secret_name_for(&binding), "appstudio-import-000001");
        assert!(client.calls_for(Verb::Get, "SPIAccessTokenBinding").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_phase_is_provisioning_error() {
        let client = InMemoryClient::new();
        client.script_statuses(
            "SPIAccessTokenBinding",
            vec![
                json!({"phase": "Pending"}),
                json!({"phase": "Error", "errorMessage": "no matching token"}),
            ],
        );
        let suffixes = SequentialSuffix::new();
        let provisioner = BindingProvisioner::new(&client, &suffixes, poll());

        let err = provisioner
            .provision(REPO, "test-ns", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.error,
            ImportError::Provisioning {
                phase: "Error".into(),
                message: "no matching token".into()
            }
        );
        assert_eq!(err.last_status.unwrap()["status"]["phase"], "Error");
        // Left in place for inspection
        assert_eq!(client.names("SPIAccessTokenBinding"), vec!["appstudio-import-000001"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_while_pending() {
        let client = InMemoryClient::new();
        client.script_statuses("SPIAccessTokenBinding", vec![json!({"phase": "Pending"})]);
        let suffixes = SequentialSuffix::new();
        let provisioner = BindingProvisioner::new(&client, &suffixes, poll());

        let err = provisioner
            .provision(REPO, "test-ns", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err.error, ImportError::Timeout { .. }));
        assert_eq!(err.last_status.unwrap()["status"]["phase"], "Pending");
    }
}
