// Copyright (c) 2026 The image-remap Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Splitting of image references into registry host, repository path and
//! tag/digest suffix.
//!
//! Only the shape of the reference is checked here. Whether a reference
//! names an image that really exists is up to the registry.

use std::{fmt, str::FromStr};

use crate::error::{RemapError, Result};

/// Decides whether the leading segment of a reference names a registry host.
///
/// A segment is a host when it
/// - contains a `.` (`gcr.io`, `registry.example.com`),
/// - contains a `:` (`127.0.0.1:5000`, `myregistry:5000`), or
/// - is exactly `localhost`.
///
/// Any other single-label segment (`library`, `weaveworks`, `myregistry`)
/// is the first namespace of an implicit Docker Hub repository.
pub fn is_registry_host(segment: &str) -> bool {
    segment == "localhost" || segment.contains('.') || segment.contains(':')
}

/// A parsed image reference.
///
/// Formatting the value with [`fmt::Display`] gives back the string it was
/// parsed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageReference {
    pub(crate) registry: Option<String>,
    pub(crate) repository: Vec<String>,
    pub(crate) suffix: Option<String>,
}

impl ImageReference {
    /// The explicit registry host. `None` means implicit Docker Hub.
    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    /// Repository path segments, never empty.
    pub fn repository(&self) -> &[String] {
        &self.repository
    }

    /// Repository path with its segments joined by `/`.
    pub fn repository_path(&self) -> String {
        self.repository.join("/")
    }

    /// Tag and/or digest together with the separator, e.g. `:1.2.3`,
    /// `@sha256:...` or `:1.2.3@sha256:...`.
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// The tag without its leading `:`, if any.
    pub fn tag(&self) -> Option<&str> {
        let suffix = self.suffix.as_deref()?.strip_prefix(':')?;
        Some(suffix.split_once('@').map_or(suffix, |(tag, _)| tag))
    }

    /// The digest without its leading `@`, if any.
    pub fn digest(&self) -> Option<&str> {
        self.suffix
            .as_deref()?
            .split_once('@')
            .map(|(_, digest)| digest)
    }
}

impl FromStr for ImageReference {
    type Err = RemapError;

    fn from_str(reference: &str) -> Result<Self> {
        if reference.is_empty() {
            return Err(RemapError::malformed(reference, "reference is empty"));
        }

        if reference.chars().any(char::is_whitespace) {
            return Err(RemapError::malformed(
                reference,
                "reference contains whitespace",
            ));
        }

        let (registry, remainder) = match reference.split_once('/') {
            Some((head, rest)) if is_registry_host(head) => (Some(head), rest),
            _ => (None, reference),
        };

        let (name, digest) = match remainder.split_once('@') {
            Some((name, digest)) => (name, Some(digest)),
            None => (remainder, None),
        };
        if digest == Some("") {
            return Err(RemapError::malformed(reference, "digest is empty"));
        }

        // A `:` only separates a tag inside the last path segment.
        let last_segment_start = name.rfind('/').map_or(0, |pos| pos + 1);
        let path = match name[last_segment_start..].rfind(':') {
            Some(pos) => {
                if last_segment_start + pos + 1 == name.len() {
                    return Err(RemapError::malformed(reference, "tag is empty"));
                }
                &name[..last_segment_start + pos]
            }
            None => name,
        };

        if path.is_empty() {
            return Err(RemapError::malformed(
                reference,
                "no repository path segment",
            ));
        }

        let repository: Vec<String> = path.split('/').map(str::to_string).collect();
        if repository.iter().any(String::is_empty) {
            return Err(RemapError::malformed(
                reference,
                "repository path contains an empty segment",
            ));
        }

        let suffix = &remainder[path.len()..];
        Ok(Self {
            registry: registry.map(str::to_string),
            repository,
            suffix: (!suffix.is_empty()).then(|| suffix.to_string()),
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{registry}/")?;
        }
        write!(f, "{}", self.repository.join("/"))?;
        if let Some(suffix) = &self.suffix {
            write!(f, "{suffix}")?;
        }
        Ok(())
    }
}
