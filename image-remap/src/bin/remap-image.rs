// Copyright (c) 2026 The image-remap Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Prints the reference a cluster should pull for each given image.

use anyhow::{Context, Result};
use clap::Parser;
use image_remap::{KubernetesVersion, RemapConfig, RemapperBuilder};
use log::debug;

#[derive(Parser)]
#[command(name = "remap-image")]
#[command(bin_name = "remap-image")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Remap configuration file, any format supported by the `config` crate
    #[arg(short, long)]
    config: Option<String>,

    /// Proxy prefix to pull every image through, e.g. `proxy.example.com/`
    #[arg(long)]
    container_proxy: Option<String>,

    /// Registry replacing the registry host of every image
    #[arg(long)]
    container_registry: Option<String>,

    /// Leave Docker Hub images to the nodes' registry mirror
    #[arg(long)]
    use_registry_mirror: bool,

    /// Kubernetes version of the cluster, e.g. `1.10` or `v1.10.3`
    #[arg(short, long)]
    kubernetes_version: Option<String>,

    /// Images to remap
    #[arg(required = true)]
    images: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RemapConfig::from_file(path)?,
        None => RemapConfig::default(),
    };
    debug!("loaded remap configuration {config:?}");

    let mut builder = RemapperBuilder::from_config(config);
    if let Some(proxy) = cli.container_proxy {
        builder = builder.container_proxy(proxy);
    }
    if let Some(registry) = cli.container_registry {
        builder = builder.container_registry(registry);
    }
    if cli.use_registry_mirror {
        builder = builder.use_docker_registry_mirror(true);
    }
    if let Some(version) = cli.kubernetes_version {
        let version: KubernetesVersion = version.parse()?;
        builder = builder.kubernetes_version(version);
    }

    let remapper = builder.build()?;
    for image in &cli.images {
        let remapped = remapper
            .remap_image(image)
            .with_context(|| format!("failed to remap image {image}"))?;
        println!("{remapped}");
    }

    Ok(())
}
