//! # Naming
//!
//! Resource name derivation: display-name sanitization, identifier validation,
//! and uniqueness suffixes for generated names.

use crate::constants::{MAX_RESOURCE_NAME_LEN, NAME_SUFFIX_LEN};
use crate::error::ImportError;
use regex::Regex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

static RESOURCE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // RFC 1123 label: [a-z0-9]([-a-z0-9]*[a-z0-9])?
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("static regex is valid")
});

/// Derive a resource name from free-form display text
///
/// Each whitespace character becomes a hyphen and letters are lowercased.
/// Other punctuation is passed through untouched, so the result is not
/// guaranteed to be a valid identifier; see [`validate_resource_name`].
///
/// ```
/// use appstudio_import::naming::sanitize;
///
/// assert_eq!(sanitize("My App"), "my-app");
/// assert_eq!(sanitize("!  @  #"), "!--@--#");
/// ```
#[must_use]
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Validate a sanitized name as a Kubernetes resource name (RFC 1123 label)
/// Format: lowercase alphanumeric, hyphens
/// Length: 1-63 characters
/// Cannot start or end with hyphen
pub fn validate_resource_name(name: &str, field_name: &str) -> Result<(), ImportError> {
    if name.is_empty() {
        return Err(ImportError::Validation(format!(
            "{field_name} cannot be empty"
        )));
    }

    if name.len() > MAX_RESOURCE_NAME_LEN {
        return Err(ImportError::Validation(format!(
            "{field_name} '{name}' exceeds maximum length of \
             {MAX_RESOURCE_NAME_LEN} characters (got {})",
            name.len()
        )));
    }

    if !RESOURCE_NAME_RE.is_match(name) {
        return Err(ImportError::Validation(format!(
            "{field_name} '{name}' must be a valid resource name \
             (lowercase alphanumeric, hyphens; cannot start/end with hyphen)"
        )));
    }

    Ok(())
}

/// Source of uniqueness suffixes for generated resource names
///
/// Injected into the importer so tests can predict generated names.
pub trait SuffixGenerator: Send + Sync + fmt::Debug {
    /// Return a short suffix of lowercase alphanumerics
    fn next_suffix(&self) -> String;
}

/// Random suffixes taken from a v4 UUID
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffix;

impl SuffixGenerator for RandomSuffix {
    fn next_suffix(&self) -> String {
        let mut suffix = uuid::Uuid::new_v4().simple().to_string();
        suffix.truncate(NAME_SUFFIX_LEN);
        suffix
    }
}

/// Deterministic suffixes `000001`, `000002`, ...
#[derive(Debug, Default)]
pub struct SequentialSuffix {
    counter: AtomicUsize,
}

impl SequentialSuffix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SuffixGenerator for SequentialSuffix {
    fn next_suffix(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{n:0width$}", width = NAME_SUFFIX_LEN)
    }
}

/// Join a base name and a suffix, trimming the base so the result stays a valid length
#[must_use]
pub fn generated_name(base: &str, suffix: &str) -> String {
    let max_base = MAX_RESOURCE_NAME_LEN.saturating_sub(suffix.len() + 1);
    let base: String = base.chars().take(max_base).collect();
    format!("{}-{suffix}", base.trim_end_matches('-'))
}
