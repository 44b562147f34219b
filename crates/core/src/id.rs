// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate an id from a seed and timestamp.
/// Format: first 8 hex chars of SHA256(seed + timestamp)
pub fn generate_id(seed: &str, created_at: &DateTime<Utc>) -> String {
    let input = format!("{}{}", seed, created_at.to_rfc3339());
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..4])
}

/// Generate a fresh id for operations and locally created resources.
///
/// The seed mixes the process id with a process-wide sequence number so ids
/// generated within the same instant still differ.
pub fn new_id() -> String {
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let seed = format!("{}:{}", std::process::id(), sequence);
    generate_id(&seed, &Utc::now())
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
