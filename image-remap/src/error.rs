// Copyright (c) 2026 The image-remap Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RemapError>;

#[derive(Error, Debug)]
pub enum RemapError {
    #[error("malformed image reference `{reference}`: {reason}")]
    MalformedReference {
        reference: String,
        reason: &'static str,
    },

    #[error("invalid remap configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid kubernetes version `{version}`")]
    InvalidKubernetesVersion {
        version: String,
        #[source]
        source: semver::Error,
    },
}

impl RemapError {
    pub(crate) fn malformed(reference: &str, reason: &'static str) -> Self {
        Self::MalformedReference {
            reference: reference.to_string(),
            reason,
        }
    }
}
