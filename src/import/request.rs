//! # Import Request
//!
//! What the user submits: the target application, the component sources, and
//! the optional git secret and integration test. Shapes that only make sense
//! together are tagged variants, so an in-context import cannot also carry a
//! display name for a new application.

use crate::crd::{ComponentResources, EnvVar, GitSourceSpec};
use crate::error::ImportError;
use crate::naming::{sanitize, validate_resource_name};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One import submission
///
/// # Example
///
/// ```yaml
/// application:
///   mode: new
///   displayName: My Application
/// namespace: test-ns
/// autoDetect: true
/// components:
///   - name: frontend
///     source:
///       type: git
///       url: https://github.com/example/frontend
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub application: ApplicationTarget,
    pub components: Vec<ComponentSource>,
    pub namespace: String,
    /// Existing secret with git credentials; when set no binding is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Ask the platform to detect components in each repository
    #[serde(default)]
    pub auto_detect: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_test: Option<IntegrationTestDescriptor>,
    /// Validate Application, Component and test bodies without persisting them
    #[serde(default)]
    pub dry_run: bool,
}

/// Application the components are imported into
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ApplicationTarget {
    /// Create a new Application named after the sanitized display name
    New { display_name: String },
    /// Import into an Application that already exists (in-context import)
    Existing { name: String },
}

impl ApplicationTarget {
    /// Resource name of the target Application
    #[must_use]
    pub fn resource_name(&self) -> String {
        match self {
            ApplicationTarget::New { display_name } => sanitize(display_name),
            ApplicationTarget::Existing { name } => name.clone(),
        }
    }

    #[must_use]
    pub fn is_in_context(&self) -> bool {
        matches!(self, ApplicationTarget::Existing { .. })
    }
}

/// One component to import
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSource {
    /// Display name; the resource name is its sanitized form
    pub name: String,
    pub source: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ComponentResources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<i32>,
}

impl ComponentSource {
    /// Component sourced from a plain git repository
    #[must_use]
    pub fn git(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: SourceKind::Git(GitSource::new(url)),
            container_image: None,
            env: Vec::new(),
            replicas: None,
            resources: None,
            target_port: None,
        }
    }

    /// Resource name of the component
    #[must_use]
    pub fn resource_name(&self) -> String {
        sanitize(&self.name)
    }
}

/// Where the component's code and build definition come from
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SourceKind {
    Git(GitSource),
    GitWithDevfile { git: GitSource, devfile_url: String },
}

impl SourceKind {
    #[must_use]
    pub fn git(&self) -> &GitSource {
        match self {
            SourceKind::Git(git) | SourceKind::GitWithDevfile { git, .. } => git,
        }
    }

    #[must_use]
    pub fn devfile_url(&self) -> Option<&str> {
        match self {
            SourceKind::Git(_) => None,
            SourceKind::GitWithDevfile { devfile_url, .. } => Some(devfile_url),
        }
    }

    /// Git source as it appears in a Component spec
    #[must_use]
    pub fn to_spec(&self) -> GitSourceSpec {
        let git = self.git();
        GitSourceSpec {
            url: git.url.clone(),
            revision: git.revision.clone(),
            context: git.context.clone(),
            devfile_url: self.devfile_url().map(ToString::to_string),
            dockerfile_url: None,
        }
    }

    /// Apply what detection found
    ///
    /// The detected git URL and devfile replace the user's; revision is kept,
    /// and the detected context only fills in a context the user left unset.
    #[must_use]
    pub fn with_detected(&self, detected: &GitSourceSpec) -> SourceKind {
        let user = self.git();
        let url = if detected.url.trim().is_empty() {
            user.url.clone()
        } else {
            detected.url.clone()
        };
        let git = GitSource {
            url,
            revision: user.revision.clone(),
            context: user.context.clone().or_else(|| detected.context.clone()),
        };
        match detected
            .devfile_url
            .clone()
            .or_else(|| self.devfile_url().map(ToString::to_string))
        {
            Some(devfile_url) => SourceKind::GitWithDevfile { git, devfile_url },
            None => SourceKind::Git(git),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitSource {
    pub url: String,
    /// Branch, tag or commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Subdirectory holding the component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl GitSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            revision: None,
            context: None,
        }
    }
}

/// Integration test to attach to the Application
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationTestDescriptor {
    pub name: String,
    pub bundle: String,
    pub pipeline: String,
    /// Failures of an optional test do not block promotion
    #[serde(default)]
    pub optional: bool,
}

impl ImportRequest {
    /// Check the request before any API call is made
    pub fn validate(&self) -> Result<(), ImportError> {
        validate_resource_name(&self.namespace, "namespace")?;

        match &self.application {
            ApplicationTarget::New { display_name } => {
                if display_name.trim().is_empty() {
                    return Err(ImportError::Validation(
                        "application display name cannot be empty".to_string(),
                    ));
                }
                validate_resource_name(&sanitize(display_name), "application name")?;
            }
            ApplicationTarget::Existing { name } => {
                validate_resource_name(name, "application name")?;
            }
        }

        if self.components.is_empty() {
            return Err(ImportError::Validation(
                "at least one component source is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for component in &self.components {
            let name = component.resource_name();
            validate_resource_name(&name, "component name")?;
            if !seen.insert(name.clone()) {
                return Err(ImportError::Validation(format!(
                    "component name '{name}' is used more than once"
                )));
            }
            if component.source.git().url.trim().is_empty() {
                return Err(ImportError::Validation(format!(
                    "component '{}' has an empty git URL",
                    component.name
                )));
            }
            if let Some(devfile) = component.source.devfile_url() {
                if devfile.trim().is_empty() {
                    return Err(ImportError::Validation(format!(
                        "component '{}' has an empty devfile URL",
                        component.name
                    )));
                }
            }
        }

        if let Some(test) = &self.integration_test {
            validate_resource_name(&sanitize(&test.name), "integration test name")?;
            if test.bundle.trim().is_empty() || test.pipeline.trim().is_empty() {
                return Err(ImportError::Validation(format!(
                    "integration test '{}' needs both a bundle and a pipeline",
                    test.name
                )));
            }
        }

        Ok(())
    }

    /// Secret supplied by the user, ignoring blank values
    #[must_use]
    pub fn supplied_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.trim().is_empty())
    }
}
