//! # Application and Component Creator
//!
//! Persists the resources that make up the imported application.
//!
//! Applications are created once, or fetched when importing in-context.
//! Components are created, or updated with fetch-then-update: the latest
//! object is read back so the update carries its current resource version,
//! and a concurrent modification surfaces as a Conflict instead of being
//! overwritten.

use crate::client::{ResourceClient, Typed};
use crate::constants::OPTIONAL_TEST_LABEL;
use crate::crd::{
    Application, ApplicationSpec, Component, ComponentSourceSpec, ComponentSpec,
    IntegrationTestScenario, IntegrationTestScenarioSpec, TestContext,
};
use crate::error::{ImportError, OperationError};
use crate::import::request::{ApplicationTarget, ComponentSource, IntegrationTestDescriptor};
use crate::naming::{sanitize, validate_resource_name};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// How a component should be persisted
#[derive(Debug, Clone)]
pub enum ComponentVerb {
    Create,
    /// Update the component this resource names
    Update(Box<Component>),
}

/// Application resource for a new import
#[must_use]
pub fn application_resource(display_name: &str, namespace: &str) -> Application {
    let mut app = Application::new(
        &sanitize(display_name),
        ApplicationSpec {
            display_name: display_name.to_string(),
            description: None,
        },
    );
    app.metadata.namespace = Some(namespace.to_string());
    app
}

/// Component resource built from a source
///
/// Unset optional fields stay unset so they are left out of the request body.
#[must_use]
pub fn component_resource(
    source: &ComponentSource,
    application_name: &str,
    namespace: &str,
    secret_name: Option<&str>,
) -> Component {
    let mut component = Component::new(
        &source.resource_name(),
        ComponentSpec {
            component_name: source.name.clone(),
            application: application_name.to_string(),
            source: ComponentSourceSpec {
                git: Some(source.source.to_spec()),
            },
            container_image: source.container_image.clone(),
            env: (!source.env.is_empty()).then(|| source.env.clone()),
            replicas: source.replicas,
            resources: source.resources.clone(),
            target_port: source.target_port,
            secret: secret_name
                .filter(|s| !s.trim().is_empty())
                .map(ToString::to_string),
        },
    );
    component.metadata.namespace = Some(namespace.to_string());
    component
}

/// IntegrationTestScenario resource for an application
#[must_use]
pub fn integration_test_resource(
    descriptor: &IntegrationTestDescriptor,
    application_name: &str,
    namespace: &str,
) -> IntegrationTestScenario {
    let mut scenario = IntegrationTestScenario::new(
        &sanitize(&descriptor.name),
        IntegrationTestScenarioSpec {
            application: application_name.to_string(),
            bundle: descriptor.bundle.clone(),
            pipeline: descriptor.pipeline.clone(),
            contexts: vec![TestContext {
                name: "application".to_string(),
                description: "Application testing".to_string(),
            }],
        },
    );
    scenario.metadata.namespace = Some(namespace.to_string());
    if descriptor.optional {
        scenario.metadata.labels = Some(BTreeMap::from([(
            OPTIONAL_TEST_LABEL.to_string(),
            "true".to_string(),
        )]));
    }
    scenario
}

/// Creates or updates Applications, Components and integration tests
#[derive(Debug)]
pub struct ResourceCreator<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C> ResourceCreator<'a, C>
where
    C: ResourceClient + ?Sized,
{
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Create the Application, or fetch it for an in-context import
    ///
    /// A name collision on create is reported as `AlreadyExists`; existing
    /// applications are never overwritten.
    pub async fn upsert_application(
        &self,
        target: &ApplicationTarget,
        namespace: &str,
        dry_run: bool,
    ) -> Result<Application, OperationError> {
        let typed = Typed(self.client);
        match target {
            ApplicationTarget::Existing { name } => {
                debug!(application = %name, "importing into existing application");
                Ok(typed.get::<Application>(name, namespace).await?)
            }
            ApplicationTarget::New { display_name } => {
                let app = application_resource(display_name, namespace);
                let name = app.metadata.name.clone().unwrap_or_default();
                validate_resource_name(&name, "application name")?;
                let created = typed.create(&app, dry_run).await.map_err(|e| {
                    OperationError::from(match ImportError::from(e) {
                        ImportError::AlreadyExists(_) => ImportError::AlreadyExists(format!(
                            "application '{name}' in namespace '{namespace}'"
                        )),
                        other => other,
                    })
                })?;
                info!(application = %name, dry_run, "created application");
                Ok(created)
            }
        }
    }

    /// Create or update a Component for `source`
    pub async fn upsert_component(
        &self,
        source: &ComponentSource,
        application_name: &str,
        namespace: &str,
        secret_name: Option<&str>,
        dry_run: bool,
        verb: ComponentVerb,
    ) -> Result<Component, OperationError> {
        let desired = component_resource(source, application_name, namespace, secret_name);
        let typed = Typed(self.client);

        match verb {
            ComponentVerb::Create => {
                let name = desired.metadata.name.clone().unwrap_or_default();
                validate_resource_name(&name, "component name")?;
                let created = typed.create(&desired, dry_run).await?;
                info!(
                    component = %name,
                    application = %application_name,
                    dry_run,
                    "created component"
                );
                Ok(created)
            }
            ComponentVerb::Update(existing) => {
                let name = existing.metadata.name.clone().ok_or_else(|| {
                    ImportError::Validation(
                        "component to update has no metadata.name".to_string(),
                    )
                })?;
                // Re-read so the update carries the current resource version
                let mut latest: Component = typed.get(&name, namespace).await?;
                if latest.metadata.resource_version != existing.metadata.resource_version {
                    debug!(
                        component = %name,
                        "component changed since it was read by the caller, updating latest version"
                    );
                }
                latest.spec = desired.spec;
                let updated = typed.update(&latest, dry_run).await?;
                info!(
                    component = %name,
                    application = %application_name,
                    dry_run,
                    "updated component"
                );
                Ok(updated)
            }
        }
    }

    /// Attach an integration test to the application
    pub async fn create_integration_test(
        &self,
        descriptor: &IntegrationTestDescriptor,
        application_name: &str,
        namespace: &str,
        dry_run: bool,
    ) -> Result<IntegrationTestScenario, OperationError> {
        let scenario = integration_test_resource(descriptor, application_name, namespace);
        let created = Typed(self.client).create(&scenario, dry_run).await?;
        info!(
            test = %descriptor.name,
            application = %application_name,
            dry_run,
            "created integration test scenario"
        );
        Ok(created)
    }
}
