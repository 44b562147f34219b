// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::transport::TransportError;

/// All possible errors surfaced by the tally client.
///
/// Transport failures during forwarding never reach this type; they are
/// absorbed into the pending queue. Only construction of a transport can
/// fail with [`Error::Transport`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tally_core::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl Error {
    /// True when the operation failed shape validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_validation())
    }

    /// True when a referenced tab or item is missing from the cache.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
