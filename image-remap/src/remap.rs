// Copyright (c) 2026 The image-remap Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Rewriting of image references so that clusters pull them through a
//! configured container proxy or registry instead of their upstream
//! location.

use std::{str::FromStr, sync::Arc};

use log::{debug, warn};
use strum_macros::Display;

use crate::{
    config::RemapConfig,
    error::Result,
    reference::{is_registry_host, ImageReference},
};

/// Registry hosts that all denote Docker Hub.
pub const DOCKER_HUB_REGISTRIES: [&str; 3] =
    ["docker.io", "index.docker.io", "registry-1.docker.io"];

/// Current host of Kubernetes-maintained images.
pub const KUBERNETES_REGISTRY: &str = "k8s.gcr.io";

/// Host and namespace Kubernetes-maintained images were published under
/// before [`KUBERNETES_REGISTRY`] existed.
pub const LEGACY_KUBERNETES_REGISTRY: &str = "gcr.io";
pub const LEGACY_KUBERNETES_NAMESPACE: &str = "google_containers";

/// Where an image reference points to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum RegistryOrigin {
    #[strum(to_string = "legacy Kubernetes registry")]
    LegacyKubernetes,
    #[strum(to_string = "Kubernetes registry")]
    Kubernetes,
    #[strum(to_string = "Docker Hub")]
    DockerHub,
    #[strum(to_string = "other registry")]
    Other,
}

impl RegistryOrigin {
    pub fn classify(reference: &ImageReference) -> Self {
        match reference.registry() {
            Some(LEGACY_KUBERNETES_REGISTRY)
                if reference.repository()[0] == LEGACY_KUBERNETES_NAMESPACE =>
            {
                Self::LegacyKubernetes
            }
            Some(KUBERNETES_REGISTRY) => Self::Kubernetes,
            None => Self::DockerHub,
            Some(registry) if DOCKER_HUB_REGISTRIES.contains(&registry) => Self::DockerHub,
            Some(_) => Self::Other,
        }
    }
}

/// The outcome of remapping one image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerAsset {
    /// The reference the cluster should pull.
    pub image: String,

    /// The upstream reference the image comes from.
    pub canonical_location: String,
}

/// Remaps image references against one configuration.
///
/// The configuration cannot change after construction, so a remapper can be
/// cloned and shared freely between threads.
#[derive(Clone, Debug)]
pub struct ImageRemapper {
    config: Arc<RemapConfig>,
}

impl ImageRemapper {
    pub fn new(config: RemapConfig) -> Result<Self> {
        config.validate()?;

        if let (Some(proxy), Some(registry)) =
            (config.container_proxy(), config.container_registry())
        {
            warn!(
                "Both container proxy {proxy} and container registry {registry} are set, \
                 images will be pulled through the proxy."
            );
        }

        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &RemapConfig {
        &self.config
    }

    pub fn remap_image(&self, image: &str) -> Result<String> {
        Ok(rewrite(&self.config, image)?.image)
    }

    pub fn remap_asset(&self, image: &str) -> Result<ContainerAsset> {
        rewrite(&self.config, image)
    }

    /// Remaps all `images`, stopping at the first one that fails.
    pub fn remap_images<I, S>(&self, images: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        images
            .into_iter()
            .map(|image| self.remap_image(image.as_ref()))
            .collect()
    }
}

/// Remaps a single image without building an [`ImageRemapper`].
pub fn remap(image: &str, config: &RemapConfig) -> Result<String> {
    config.validate()?;
    Ok(rewrite(config, image)?.image)
}

/// Whether `reference` already lives below `proxy`, i.e. its registry is the
/// proxy host and its path starts with the proxy's namespace. Proxies that do
/// not start with a registry host never match.
fn is_behind_proxy(reference: &ImageReference, proxy: &str) -> bool {
    let mut segments = proxy.split('/');
    let host = segments.next().unwrap_or_default();
    if !is_registry_host(host) || reference.registry() != Some(host) {
        return false;
    }

    let namespace: Vec<&str> = segments.collect();
    reference.repository().len() > namespace.len()
        && namespace
            .iter()
            .zip(reference.repository())
            .all(|(namespace, segment)| segment.as_str() == *namespace)
}

fn rewrite(config: &RemapConfig, image: &str) -> Result<ContainerAsset> {
    let proxy = config.container_proxy();
    let mut reference = ImageReference::from_str(image)?;

    // The asset system may remap the same image more than once before the
    // cluster spec converges.
    if let Some(proxy) = proxy.filter(|proxy| is_behind_proxy(&reference, proxy)) {
        debug!("Image {image} is already pulled through proxy {proxy}.");
        return Ok(ContainerAsset {
            image: image.to_string(),
            canonical_location: image.to_string(),
        });
    }

    let mut origin = RegistryOrigin::classify(&reference);

    if origin == RegistryOrigin::Kubernetes
        && !config
            .kubernetes_version
            .is_at_least(&config.kubernetes_registry_min_version)
    {
        debug!(
            "Kubernetes {} predates {KUBERNETES_REGISTRY}, \
             using {LEGACY_KUBERNETES_REGISTRY}/{LEGACY_KUBERNETES_NAMESPACE} for {image}.",
            config.kubernetes_version
        );
        reference.registry = Some(LEGACY_KUBERNETES_REGISTRY.to_string());
        reference
            .repository
            .insert(0, LEGACY_KUBERNETES_NAMESPACE.to_string());
        origin = RegistryOrigin::LegacyKubernetes;
    }

    let canonical_location = reference.to_string();
    let path = reference.repository_path();
    let suffix = reference.suffix().unwrap_or_default();

    let proxy = proxy.filter(|_| {
        let mirrored = origin == RegistryOrigin::DockerHub && config.use_docker_registry_mirror;
        if mirrored {
            debug!("Image {image} is served by the Docker registry mirror, skipping proxy.");
        }
        !mirrored
    });

    let remapped = match (proxy, config.container_registry()) {
        (Some(proxy), _) => format!("{proxy}/{path}{suffix}"),
        (None, Some(registry)) => format!("{registry}/{path}{suffix}"),
        (None, None) => canonical_location.clone(),
    };

    debug!("Image {image} from {origin} remapped to {remapped}.");
    Ok(ContainerAsset {
        image: remapped,
        canonical_location,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::{remap, ContainerAsset, ImageRemapper, RegistryOrigin};
    use crate::{
        config::{AssetsLocation, RemapConfig},
        error::RemapError,
        reference::ImageReference,
        version::KubernetesVersion,
    };

    fn remap_config(
        proxy: Option<&str>,
        registry: Option<&str>,
        use_docker_registry_mirror: bool,
        version: &str,
    ) -> RemapConfig {
        RemapConfig {
            assets: AssetsLocation {
                container_registry: registry.map(str::to_string),
                container_proxy: proxy.map(str::to_string),
            },
            use_docker_registry_mirror,
            kubernetes_version: version.parse().unwrap(),
            ..Default::default()
        }
    }

    fn proxy_remapper(proxy: &str, version: &str) -> ImageRemapper {
        ImageRemapper::new(remap_config(Some(proxy), None, false, version)).unwrap()
    }

    #[rstest]
    #[case("gcr.io/google_containers/kube-apiserver", RegistryOrigin::LegacyKubernetes)]
    #[case("gcr.io/other-project/image", RegistryOrigin::Other)]
    #[case("k8s.gcr.io/kube-apiserver:1.2.3", RegistryOrigin::Kubernetes)]
    #[case("debian", RegistryOrigin::DockerHub)]
    #[case("weaveworks/weave-kube", RegistryOrigin::DockerHub)]
    #[case("docker.io/library/debian", RegistryOrigin::DockerHub)]
    #[case("index.docker.io/library/debian", RegistryOrigin::DockerHub)]
    #[case("quay.io/coreos/etcd", RegistryOrigin::Other)]
    #[case("localhost:5000/debian", RegistryOrigin::Other)]
    fn test_classify(#[case] image: &str, #[case] expected: RegistryOrigin) {
        let reference = ImageReference::from_str(image).unwrap();
        assert_eq!(RegistryOrigin::classify(&reference), expected);
    }

    #[rstest]
    #[case::hub_through_proxy(
        "weaveworks/weave-kube",
        Some("proxy.example.com/"),
        None,
        false,
        "1.10",
        "proxy.example.com/weaveworks/weave-kube"
    )]
    #[case::proxy_without_trailing_slash(
        "debian",
        Some("proxy.example.com"),
        None,
        false,
        "0.0.0",
        "proxy.example.com/debian"
    )]
    #[case::explicit_hub_through_proxy(
        "docker.io/library/debian:12",
        Some("proxy.example.com/"),
        None,
        false,
        "1.10",
        "proxy.example.com/library/debian:12"
    )]
    #[case::hub_left_for_mirror(
        "docker.io/library/debian:12",
        Some("proxy.example.com/"),
        None,
        true,
        "1.10",
        "docker.io/library/debian:12"
    )]
    #[case::other_registry_through_proxy(
        "quay.io/coreos/etcd@sha256:abcd",
        Some("proxy.example.com/"),
        None,
        true,
        "1.10",
        "proxy.example.com/coreos/etcd@sha256:abcd"
    )]
    #[case::kubernetes_before_short_names(
        "k8s.gcr.io/kube-apiserver:v1.9.3",
        Some("proxy.example.com/"),
        None,
        false,
        "1.9.3",
        "proxy.example.com/google_containers/kube-apiserver:v1.9.3"
    )]
    #[case::kubernetes_before_short_names_without_proxy(
        "k8s.gcr.io/kube-apiserver:v1.9.3",
        None,
        None,
        false,
        "1.9.3",
        "gcr.io/google_containers/kube-apiserver:v1.9.3"
    )]
    #[case::kubernetes_unchanged_without_override(
        "k8s.gcr.io/kube-apiserver:v1.10.0",
        None,
        None,
        false,
        "1.10",
        "k8s.gcr.io/kube-apiserver:v1.10.0"
    )]
    #[case::explicit_registry(
        "k8s.gcr.io/kube-apiserver:v1.10.0",
        None,
        Some("registry.example.com"),
        false,
        "1.10",
        "registry.example.com/kube-apiserver:v1.10.0"
    )]
    #[case::explicit_registry_with_namespace(
        "weaveworks/weave-kube:2.3.0",
        None,
        Some("registry.example.com/mirror/"),
        false,
        "1.10",
        "registry.example.com/mirror/weaveworks/weave-kube:2.3.0"
    )]
    #[case::explicit_registry_ignores_mirror(
        "debian",
        None,
        Some("registry.example.com"),
        true,
        "1.10",
        "registry.example.com/debian"
    )]
    #[case::mirror_falls_back_to_registry(
        "debian",
        Some("proxy.example.com/"),
        Some("registry.example.com"),
        true,
        "1.10",
        "registry.example.com/debian"
    )]
    #[case::proxy_over_registry(
        "quay.io/coreos/etcd",
        Some("proxy.example.com/"),
        Some("registry.example.com"),
        false,
        "1.10",
        "proxy.example.com/coreos/etcd"
    )]
    #[case::hub_unchanged_without_override(
        "debian:12",
        None,
        None,
        false,
        "1.10",
        "debian:12"
    )]
    fn test_remap_image(
        #[case] image: &str,
        #[case] proxy: Option<&str>,
        #[case] registry: Option<&str>,
        #[case] use_docker_registry_mirror: bool,
        #[case] version: &str,
        #[case] expected: &str,
    ) {
        let config = remap_config(proxy, registry, use_docker_registry_mirror, version);
        let remapper = ImageRemapper::new(config.clone()).unwrap();
        assert_eq!(remapper.remap_image(image).unwrap(), expected);
        assert_eq!(remap(image, &config).unwrap(), expected);
    }

    #[test]
    fn test_remap_asset_keeps_canonical_location() {
        let remapper = proxy_remapper("proxy.example.com/", "1.9");

        let asset = remapper.remap_asset("k8s.gcr.io/pause:3.1").unwrap();
        assert_eq!(
            asset,
            ContainerAsset {
                image: "proxy.example.com/google_containers/pause:3.1".into(),
                canonical_location: "gcr.io/google_containers/pause:3.1".into(),
            }
        );
    }

    #[test]
    fn test_remap_is_stable_when_repeated() {
        let remapper = proxy_remapper("proxy.example.com/", "1.10");

        for image in [
            "debian",
            "weaveworks/weave-kube:2.3.0",
            "k8s.gcr.io/kube-apiserver:1.2.3",
            "gcr.io/google_containers/kube-apiserver",
        ] {
            let once = remapper.remap_image(image).unwrap();
            let twice = remapper.remap_image(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[rstest]
    #[case::behind_proxy(
        "proxy.example.com/",
        "proxy.example.com/debian",
        "proxy.example.com/debian"
    )]
    #[case::proxy_without_trailing_slash(
        "proxy.example.com",
        "proxy.example.com/debian:12",
        "proxy.example.com/debian:12"
    )]
    #[case::behind_proxy_namespace(
        "proxy.example.com/cache/",
        "proxy.example.com/cache/debian",
        "proxy.example.com/cache/debian"
    )]
    #[case::outside_proxy_namespace(
        "proxy.example.com/cache/",
        "proxy.example.com/other/debian",
        "proxy.example.com/cache/other/debian"
    )]
    #[case::proxy_namespace_only(
        "proxy.example.com/cache/",
        "proxy.example.com/cache",
        "proxy.example.com/cache/cache"
    )]
    #[case::host_sharing_proxy_text(
        "proxy.example.com/",
        "proxy.example.com.evil/x",
        "proxy.example.com/x"
    )]
    #[case::hub_namespace_named_like_proxy("mirror/", "mirror/app", "mirror/mirror/app")]
    #[case::proxy_with_port("localhost:5000/", "localhost:5000/debian", "localhost:5000/debian")]
    fn test_remap_already_proxied(
        #[case] proxy: &str,
        #[case] image: &str,
        #[case] expected: &str,
    ) {
        let remapper = proxy_remapper(proxy, "1.10");
        assert_eq!(remapper.remap_image(image).unwrap(), expected);
    }

    #[rstest]
    #[case("proxy.example.com//x")]
    #[case("proxy.example.com/")]
    #[case("proxy.example.com/debian:")]
    #[case("proxy.example.com/debian@")]
    fn test_remap_malformed_behind_proxy(#[case] image: &str) {
        let remapper = proxy_remapper("proxy.example.com/", "1.10");
        let err = remapper.remap_image(image).unwrap_err();
        assert!(
            matches!(err, RemapError::MalformedReference { .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_remap_images_stops_at_first_error() {
        let remapper = proxy_remapper("proxy.example.com/", "1.10");

        let remapped = remapper
            .remap_images(["debian", "k8s.gcr.io/pause"])
            .unwrap();
        assert_eq!(
            remapped,
            vec!["proxy.example.com/debian", "proxy.example.com/pause"]
        );

        let err = remapper
            .remap_images(vec!["debian".to_string(), "".to_string()])
            .unwrap_err();
        assert!(matches!(err, RemapError::MalformedReference { .. }));
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let config = remap_config(None, Some("not-a-host"), false, "1.10");
        assert!(matches!(
            ImageRemapper::new(config.clone()),
            Err(RemapError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            remap("debian", &config),
            Err(RemapError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_remapper_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<ImageRemapper>();

        let remapper = ImageRemapper::new(RemapConfig {
            kubernetes_version: KubernetesVersion::new(1, 10, 0),
            ..Default::default()
        })
        .unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let remapper = remapper.clone();
                std::thread::spawn(move || remapper.remap_image(&format!("image-{i}:latest")))
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap().unwrap(), format!("image-{i}:latest"));
        }
    }
}
