// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-core: Shared library for the tally tab service
//!
//! This crate provides the resource model, operation types, and the
//! normalization primitives used by both the tally client and the remote.

pub mod error;
pub mod id;
pub mod normalize;
pub mod operation;
pub mod reference;
pub mod resource;

pub use error::{Error, Result};
pub use normalize::{flatten, hydrate, Record};
pub use operation::{Operation, OperationPayload, Product};
pub use reference::Reference;
pub use resource::{Item, ItemStatus, Resource, Tab, TabStatus};
