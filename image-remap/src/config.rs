// Copyright (c) 2026 The image-remap Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::path::Path;

use anyhow::{bail, Context};
use config::{Config, File};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::{RemapError, Result},
    reference::is_registry_host,
    version::KubernetesVersion,
};

/// From this version on, images are published under the short
/// `k8s.gcr.io/<image>` names. Older releases only exist under
/// `gcr.io/google_containers/<image>`.
pub const DEFAULT_KUBERNETES_REGISTRY_MIN_VERSION: KubernetesVersion =
    KubernetesVersion::new(1, 10, 0);

/// Where container images should be pulled from instead of their upstream
/// location.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetsLocation {
    /// A registry, optionally followed by a namespace path, that replaces the
    /// registry host of every image, e.g. `registry.example.com/mirror`.
    ///
    /// This value defaults to `None`.
    #[serde(default, alias = "containerRegistry")]
    pub container_registry: Option<String>,

    /// A prefix every image is pulled through, e.g. `proxy.example.com/`.
    /// The original registry host is dropped. Takes precedence over
    /// `container_registry`.
    ///
    /// This value defaults to `None`.
    #[serde(default, alias = "containerProxy")]
    pub container_proxy: Option<String>,
}

/// Configuration of an [`crate::ImageRemapper`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RemapConfig {
    #[serde(default)]
    pub assets: AssetsLocation,

    /// Docker Hub images are served by a registry mirror configured on the
    /// nodes, so they must not be routed through `container_proxy`.
    ///
    /// This value defaults to `false`.
    #[serde(default, alias = "useDockerRegistryMirror")]
    pub use_docker_registry_mirror: bool,

    /// The Kubernetes version of the cluster the images are for.
    ///
    /// This value defaults to `0.0.0`.
    #[serde(default, alias = "kubernetesVersion")]
    pub kubernetes_version: KubernetesVersion,

    /// First Kubernetes version whose images resolve under the short
    /// `k8s.gcr.io/<image>` names.
    ///
    /// This defaults to [`DEFAULT_KUBERNETES_REGISTRY_MIN_VERSION`].
    #[serde(default = "default_kubernetes_registry_min_version")]
    pub kubernetes_registry_min_version: KubernetesVersion,
}

fn default_kubernetes_registry_min_version() -> KubernetesVersion {
    DEFAULT_KUBERNETES_REGISTRY_MIN_VERSION
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            assets: AssetsLocation::default(),
            use_docker_registry_mirror: false,
            kubernetes_version: KubernetesVersion::default(),
            kubernetes_registry_min_version: DEFAULT_KUBERNETES_REGISTRY_MIN_VERSION,
        }
    }
}

impl RemapConfig {
    /// Load `RemapConfig` from a configuration file. Supported formats are all
    /// formats supported by the `config` crate.
    pub fn from_file(config_path: &str) -> anyhow::Result<Self> {
        info!("Use remap configuration file {config_path}");
        if !Path::new(config_path).exists() {
            bail!("Config file {config_path} not found.")
        }

        let c = Config::builder()
            .add_source(File::with_name(config_path))
            .build()?;

        let res: Self = c.try_deserialize().context("invalid config")?;
        res.validate()?;
        Ok(res)
    }

    pub fn from_toml_str(config: &str) -> anyhow::Result<Self> {
        let res: Self = toml::from_str(config).context("invalid config")?;
        res.validate()?;
        Ok(res)
    }

    /// The proxy prefix without trailing `/`, if any.
    pub fn container_proxy(&self) -> Option<&str> {
        self.assets
            .container_proxy
            .as_deref()
            .map(|proxy| proxy.trim_end_matches('/'))
    }

    /// The explicit registry without trailing `/`, if any.
    pub fn container_registry(&self) -> Option<&str> {
        self.assets
            .container_registry
            .as_deref()
            .map(|registry| registry.trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(proxy) = self.container_proxy() {
            check_location("container proxy", proxy)?;
        }

        if let Some(registry) = self.container_registry() {
            check_location("container registry", registry)?;

            let mut segments = registry.split('/');
            let host = segments.next().unwrap_or_default();
            if !is_registry_host(host) {
                return Err(RemapError::InvalidConfiguration(format!(
                    "container registry `{registry}` does not start with a registry host"
                )));
            }

            if segments.any(|segment| segment.is_empty() || segment.contains(':')) {
                return Err(RemapError::InvalidConfiguration(format!(
                    "container registry `{registry}` has an invalid namespace path"
                )));
            }
        }

        Ok(())
    }
}

fn check_location(name: &str, location: &str) -> Result<()> {
    if location.is_empty() {
        return Err(RemapError::InvalidConfiguration(format!("{name} is empty")));
    }

    if location.chars().any(char::is_whitespace) {
        return Err(RemapError::InvalidConfiguration(format!(
            "{name} `{location}` contains whitespace"
        )));
    }

    if location.contains('@') {
        return Err(RemapError::InvalidConfiguration(format!(
            "{name} `{location}` must not carry a digest"
        )));
    }

    Ok(())
}
