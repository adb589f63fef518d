// Copyright (c) 2026 The image-remap Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::{fmt, str::FromStr};

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RemapError, Result};

/// Target Kubernetes version of a cluster.
///
/// Accepts the loose forms used in cluster specs: an optional leading `v`
/// and missing minor or patch components, so `1.10`, `v1.10` and `1.10.0`
/// are the same version.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KubernetesVersion(Version);

impl KubernetesVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    /// Compares release numbers only. Pre-release and build metadata are
    /// ignored, so `1.10.0-beta.1` counts as `1.10.0`.
    pub fn is_at_least(&self, other: &KubernetesVersion) -> bool {
        (self.0.major, self.0.minor, self.0.patch)
            >= (other.0.major, other.0.minor, other.0.patch)
    }

    pub fn as_semver(&self) -> &Version {
        &self.0
    }
}

impl FromStr for KubernetesVersion {
    type Err = RemapError;

    fn from_str(version: &str) -> Result<Self> {
        let trimmed = version.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let (core, rest) = match trimmed.find(['-', '+']) {
            Some(pos) => trimmed.split_at(pos),
            None => (trimmed, ""),
        };

        let mut normalized = core.to_string();
        for _ in core.split('.').count()..3 {
            normalized.push_str(".0");
        }
        normalized.push_str(rest);

        Version::parse(&normalized)
            .map(Self)
            .map_err(|source| RemapError::InvalidKubernetesVersion {
                version: version.to_string(),
                source,
            })
    }
}

impl Default for KubernetesVersion {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

impl From<Version> for KubernetesVersion {
    fn from(version: Version) -> Self {
        Self(version)
    }
}

impl fmt::Display for KubernetesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for KubernetesVersion {
    fn serialize<S>(&self, ser: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ser.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KubernetesVersion {
    fn deserialize<D: Deserializer<'de>>(de: D) -> std::result::Result<Self, D::Error> {
        let intermediate = String::deserialize(de)?;
        intermediate
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("{e}")))
    }
}
