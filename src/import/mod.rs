//! # Import Orchestration
//!
//! Drives one import from submission to created resources.
//!
//! ## Pipeline
//!
//! 1. Validate the request (names are sanitized and checked up front)
//! 2. Provision an access-token binding per distinct git URL, unless a secret
//!    was supplied
//! 3. Detect components in each repository, when requested
//! 4. Create the Application, or fetch it for an in-context import
//! 5. Create every Component concurrently, collecting all outcomes
//! 6. Attach the integration test, when one is described
//!
//! Stages run strictly in order and the first stage failure ends the run.
//! Resources created before a failure or a cancellation are left in place.
//!
//! ## Module Structure
//!
//! - `request.rs` - submission types and validation
//! - `binding.rs` - access-token binding provisioner
//! - `detection.rs` - component detector
//! - `resources.rs` - Application, Component and integration test creator

pub mod binding;
pub mod detection;
pub mod request;
pub mod resources;

pub use binding::{access_token_binding, secret_name_for, BindingProvisioner};
pub use detection::{detection_query, ComponentDetector};
pub use request::{
    ApplicationTarget, ComponentSource, GitSource, ImportRequest, IntegrationTestDescriptor,
    SourceKind,
};
pub use resources::{ComponentVerb, ResourceCreator};

use crate::client::ResourceClient;
use crate::config::ImportConfig;
use crate::crd::DetectedComponent;
use crate::error::{ComponentFailure, ImportError, ImportFailure, Stage};
use crate::naming::{validate_resource_name, RandomSuffix, SuffixGenerator};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Resources produced by a successful import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub application: String,
    /// True when the Application already existed
    pub in_context: bool,
    /// Component resource names, in request order
    pub components: Vec<String>,
    /// Access-token bindings created for the run
    pub bindings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_test: Option<String>,
    pub dry_run: bool,
}

/// A component queued for creation, with the git URL whose credentials it uses
#[derive(Debug, Clone)]
struct PlannedComponent {
    source: ComponentSource,
    credentials_url: String,
}

/// Runs imports against a [`ResourceClient`]
#[derive(Debug)]
pub struct Importer<C> {
    client: C,
    config: ImportConfig,
    suffixes: Box<dyn SuffixGenerator>,
}

impl<C: ResourceClient> Importer<C> {
    pub fn new(client: C, config: ImportConfig) -> Self {
        Self {
            client,
            config,
            suffixes: Box::new(RandomSuffix),
        }
    }

    /// Replace the generator used for binding and detection query names
    #[must_use]
    pub fn with_suffixes(mut self, suffixes: impl SuffixGenerator + 'static) -> Self {
        self.suffixes = Box::new(suffixes);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run one import
    ///
    /// Cancelling `cancel` stops in-flight polls and skips the remaining
    /// stages; the run then fails with [`ImportError::Cancelled`].
    pub async fn run(
        &self,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> Result<ImportOutcome, ImportFailure> {
        let span = info_span!(
            "import",
            application = %request.application.resource_name(),
            namespace = %request.namespace,
            dry_run = request.dry_run,
        );
        self.run_stages(request, cancel).instrument(span).await
    }

    async fn run_stages(
        &self,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> Result<ImportOutcome, ImportFailure> {
        request
            .validate()
            .map_err(|e| ImportFailure::at(Stage::Validation, e))?;
        info!(components = request.components.len(), "import request accepted");

        let secrets = self.provision_bindings(request, cancel).await?;
        let planned = self.plan_components(request, cancel).await?;

        ensure_active(cancel, Stage::Application)?;
        let creator = ResourceCreator::new(&self.client);
        let application = creator
            .upsert_application(&request.application, &request.namespace, request.dry_run)
            .await
            .map_err(|e| ImportFailure::at(Stage::Application, e))?;
        let application_name = application.metadata.name.clone().unwrap_or_default();

        ensure_active(cancel, Stage::Component)?;
        let components = self
            .create_components(&creator, request, &application_name, &planned, &secrets)
            .await?;

        let integration_test = match &request.integration_test {
            Some(descriptor) => {
                ensure_active(cancel, Stage::IntegrationTest)?;
                let scenario = creator
                    .create_integration_test(
                        descriptor,
                        &application_name,
                        &request.namespace,
                        request.dry_run,
                    )
                    .await
                    .map_err(|e| ImportFailure::at(Stage::IntegrationTest, e))?;
                scenario.metadata.name
            }
            None => None,
        };

        info!(
            application = %application_name,
            components = components.len(),
            "import completed"
        );
        Ok(ImportOutcome {
            application: application_name,
            in_context: request.application.is_in_context(),
            components,
            bindings: secrets.bindings,
            integration_test,
            dry_run: request.dry_run,
        })
    }

    /// Bind git credentials for every distinct repository
    async fn provision_bindings(
        &self,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> Result<Secrets, ImportFailure> {
        if let Some(secret) = request.supplied_secret() {
            return Ok(Secrets::supplied(secret));
        }
        if request.dry_run {
            debug!("dry run, skipping access token bindings");
            return Ok(Secrets::default());
        }

        let provisioner = BindingProvisioner::new(
            &self.client,
            self.suffixes.as_ref(),
            self.config.binding_poll(),
        );
        let mut secrets = Secrets::default();
        for url in distinct_urls(&request.components) {
            ensure_active(cancel, Stage::Binding)?;
            let binding = provisioner
                .provision(url, &request.namespace, None, cancel)
                .await
                .map_err(|e| ImportFailure::at(Stage::Binding, e))?;
            if let Some(binding) = binding {
                secrets
                    .by_url
                    .insert(url.to_string(), secret_name_for(&binding));
                secrets
                    .bindings
                    .push(binding.metadata.name.unwrap_or_default());
            }
        }
        Ok(secrets)
    }

    /// Expand the request's sources with what detection finds
    async fn plan_components(
        &self,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<PlannedComponent>, ImportFailure> {
        let as_requested = || -> Vec<PlannedComponent> {
            request
                .components
                .iter()
                .map(|source| PlannedComponent {
                    credentials_url: source.source.git().url.clone(),
                    source: source.clone(),
                })
                .collect()
        };
        if !request.auto_detect {
            return Ok(as_requested());
        }
        if request.dry_run {
            debug!("dry run, skipping component detection");
            return Ok(as_requested());
        }

        let detector = ComponentDetector::new(
            &self.client,
            self.suffixes.as_ref(),
            self.config.detection_poll(),
        );
        let application_name = request.application.resource_name();
        let mut planned = Vec::new();
        for source in &request.components {
            ensure_active(cancel, Stage::Detection)?;
            let git = source.source.git();
            let detected = detector
                .detect(
                    &application_name,
                    &git.url,
                    &request.namespace,
                    git.context.as_deref(),
                    source.source.devfile_url(),
                    cancel,
                )
                .await
                .map_err(|e| ImportFailure::at(Stage::Detection, e))?;
            info!(
                component = %source.name,
                detected = detected.len(),
                "component detection finished"
            );
            planned.extend(merge_detected(source, &detected).into_iter().map(|merged| {
                PlannedComponent {
                    source: merged,
                    credentials_url: git.url.clone(),
                }
            }));
        }

        let mut seen = HashSet::new();
        for component in &planned {
            let name = component.source.resource_name();
            validate_resource_name(&name, "detected component name")
                .map_err(|e| ImportFailure::at(Stage::Detection, e))?;
            if !seen.insert(name.clone()) {
                return Err(ImportFailure::at(
                    Stage::Detection,
                    ImportError::Validation(format!(
                        "detection produced component name '{name}' more than once"
                    )),
                ));
            }
        }
        Ok(planned)
    }

    /// Create every component concurrently and report all failures together
    async fn create_components(
        &self,
        creator: &ResourceCreator<'_, C>,
        request: &ImportRequest,
        application_name: &str,
        planned: &[PlannedComponent],
        secrets: &Secrets,
    ) -> Result<Vec<String>, ImportFailure> {
        let results = join_all(planned.iter().map(|component| {
            creator.upsert_component(
                &component.source,
                application_name,
                &request.namespace,
                secrets.for_url(&component.credentials_url),
                request.dry_run,
                ComponentVerb::Create,
            )
        }))
        .await;

        let mut created = Vec::new();
        let mut failures = Vec::new();
        for (component, result) in planned.iter().zip(results) {
            let name = component.source.resource_name();
            match result {
                Ok(_) => created.push(name),
                Err(error) => {
                    warn!(component = %name, error = %error, "component creation failed");
                    failures.push(ComponentFailure {
                        component: name,
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(created)
        } else {
            Err(ImportFailure::Components {
                application: application_name.to_string(),
                created,
                failures,
            })
        }
    }
}

/// Git credentials available to components
#[derive(Debug, Default)]
struct Secrets {
    supplied: Option<String>,
    by_url: BTreeMap<String, String>,
    bindings: Vec<String>,
}

impl Secrets {
    fn supplied(secret: &str) -> Self {
        Self {
            supplied: Some(secret.to_string()),
            ..Self::default()
        }
    }

    fn for_url(&self, url: &str) -> Option<&str> {
        self.supplied
            .as_deref()
            .or_else(|| self.by_url.get(url).map(String::as_str))
    }
}

fn ensure_active(cancel: &CancellationToken, stage: Stage) -> Result<(), ImportFailure> {
    if cancel.is_cancelled() {
        info!(stage = %stage, "import cancelled");
        return Err(ImportFailure::at(stage, ImportError::Cancelled));
    }
    Ok(())
}

/// Git URLs in first-seen order
fn distinct_urls(components: &[ComponentSource]) -> Vec<&str> {
    let mut seen = HashSet::new();
    components
        .iter()
        .map(|c| c.source.git().url.as_str())
        .filter(|url| seen.insert(*url))
        .collect()
}

/// Apply detection results to a user-supplied source
///
/// A single detected component keeps the user's name; several are named
/// after the user's name plus their detection ID. Nothing detected keeps the
/// source as submitted.
fn merge_detected(
    source: &ComponentSource,
    detected: &BTreeMap<String, DetectedComponent>,
) -> Vec<ComponentSource> {
    if detected.is_empty() {
        return vec![source.clone()];
    }
    let fan_out = detected.len() > 1;
    detected
        .iter()
        .map(|(id, component)| {
            let stub = &component.component_stub;
            let mut merged = source.clone();
            if fan_out {
                merged.name = format!("{} {id}", source.name);
            }
            if let Some(git) = &stub.source.git {
                merged.source = source.source.with_detected(git);
            }
            merged.target_port = source.target_port.or(stub.target_port);
            merged
        })
        .collect()
}
