//! # Component Detector
//!
//! Runs a ComponentDetectionQuery against a repository and returns the
//! components the platform found in it.

use crate::client::{ResourceClient, Typed};
use crate::crd::{
    ComponentDetectionQuery, ComponentDetectionQuerySpec, DetectedComponent, GitSourceSpec,
};
use crate::error::{ImportError, OperationError};
use crate::naming::{generated_name, sanitize, SuffixGenerator};
use crate::poller::{poll_until, PollSettings};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Build a detection query for one repository
#[must_use]
pub fn detection_query(
    name: &str,
    namespace: &str,
    git_url: &str,
    context: Option<&str>,
    devfile_url: Option<&str>,
) -> ComponentDetectionQuery {
    let mut query = ComponentDetectionQuery::new(
        name,
        ComponentDetectionQuerySpec {
            git: GitSourceSpec {
                url: git_url.to_string(),
                context: context.map(ToString::to_string),
                devfile_url: devfile_url.map(ToString::to_string),
                ..Default::default()
            },
        },
    );
    query.metadata.namespace = Some(namespace.to_string());
    query
}

fn completed_ok(query: &ComponentDetectionQuery) -> bool {
    query.status.as_ref().is_some_and(|s| s.is_succeeded())
}

fn completed_failed(query: &ComponentDetectionQuery) -> bool {
    query.status.as_ref().is_some_and(|s| s.is_failed())
}

/// Creates detection queries and waits for them to complete
#[derive(Debug)]
pub struct ComponentDetector<'a, C: ?Sized> {
    client: &'a C,
    suffixes: &'a dyn SuffixGenerator,
    poll: PollSettings,
}

impl<'a, C> ComponentDetector<'a, C>
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

    /// Detect components in `git_url`
    ///
    /// The map is empty when the query completed without detecting anything.
    pub async fn detect(
        &self,
        application_name: &str,
        git_url: &str,
        namespace: &str,
        context: Option<&str>,
        devfile_url: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, DetectedComponent>, OperationError> {
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled.into());
        }

        let name = generated_name(&sanitize(application_name), &self.suffixes.next_suffix());
        let typed = Typed(self.client);
        let created = typed
            .create(
                &detection_query(&name, namespace, git_url, context, devfile_url),
                false,
            )
            .await?;
        info!(query = %name, repo = %git_url, "created component detection query");

        let mut seed = Some(created);
        let typed = &typed;
        let name_ref = name.as_str();
        let result = poll_until(
            move || {
                let seeded = seed.take();
                async move {
                    match seeded {
                        Some(query) => Ok(query),
                        None => typed.get::<ComponentDetectionQuery>(name_ref, namespace).await,
                    }
                }
            },
            completed_ok,
            completed_failed,
            &self.poll,
            cancel,
        )
        .await;

        match result {
            Ok(query) => {
                let status = query.status.unwrap_or_default();
                let detected = if status.component_detected {
                    status.detected_components
                } else {
                    BTreeMap::new()
                };
                info!(query = %name, detected = detected.len(), "component detection completed");
                Ok(detected)
            }
            Err(err) => {
                warn!(query = %name, "component detection did not complete");
                Err(err.into_operation_error(|q| ImportError::Detection {
                    message: q
                        .status
                        .as_ref()
                        .and_then(|s| s.completion_message())
                        .unwrap_or("detection query reported Completed=False")
                        .to_string(),
                }))
            }
        }
    }
}
