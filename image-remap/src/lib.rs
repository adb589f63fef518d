// Copyright (c) 2026 The image-remap Authors
//
// SPDX-License-Identifier: Apache-2.0

//! Rewrites container image references so that a cluster pulls them through
//! a configured proxy or private registry instead of their upstream
//! location.

pub mod builder;
pub mod config;
pub mod error;
pub mod reference;
pub mod remap;
pub mod version;

pub use builder::RemapperBuilder;
pub use config::{AssetsLocation, RemapConfig};
pub use error::{RemapError, Result};
pub use reference::{is_registry_host, ImageReference};
pub use remap::{remap, ContainerAsset, ImageRemapper, RegistryOrigin};
pub use version::KubernetesVersion;
