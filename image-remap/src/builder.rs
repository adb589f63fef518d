// Copyright (c) 2026 The image-remap Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::{
    config::RemapConfig, error::Result, remap::ImageRemapper, version::KubernetesVersion,
};

#[derive(Default)]
pub struct RemapperBuilder {
    config: RemapConfig,
}

macro_rules! __impl_config {
    (assets.$name: ident) => {
        pub fn $name(mut self, $name: impl Into<String>) -> Self {
            self.config.assets.$name = Some($name.into());
            self
        }
    };
    ($name: ident, $type: ident) => {
        pub fn $name(mut self, $name: $type) -> Self {
            self.config.$name = $name;
            self
        }
    };
}

impl RemapperBuilder {
    __impl_config!(assets.container_proxy);
    __impl_config!(assets.container_registry);
    __impl_config!(use_docker_registry_mirror, bool);
    __impl_config!(kubernetes_version, KubernetesVersion);
    __impl_config!(kubernetes_registry_min_version, KubernetesVersion);

    /// Starts from an already loaded configuration, e.g. one read with
    /// [`RemapConfig::from_file`].
    pub fn from_config(config: RemapConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<ImageRemapper> {
        ImageRemapper::new(self.config)
    }
}
