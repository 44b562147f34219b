// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! References identify resources and collections in the cache.
//!
//! A reference is written `kind:id`. The same string prefixed with `ref:`
//! is a pointer embedded inside a normalized resource in place of the
//! resource it points at.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix marking an embedded pointer inside a stored resource.
pub const POINTER_PREFIX: &str = "ref:";

/// Collection key invalidated when the set of tabs changes.
pub const LIST_TABS: &str = "listTabs";

/// Collection key invalidated when the items of one tab change.
pub const LIST_TAB_ITEMS: &str = "listTabItems";

/// A `kind:id` pair naming a resource or a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Reference {
    kind: String,
    id: String,
}

impl Reference {
    /// Creates a reference from its parts.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Reference {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Reference to a tab resource.
    pub fn tab(id: impl Into<String>) -> Self {
        Reference::new(crate::resource::KIND_TAB, id)
    }

    /// Reference to an item resource.
    pub fn item(id: impl Into<String>) -> Self {
        Reference::new(crate::resource::KIND_ITEM, id)
    }

    /// The "all tabs" collection.
    pub fn all_tabs() -> Self {
        Reference::new(LIST_TABS, "all")
    }

    /// The item collection of one tab.
    pub fn tab_items(tab_id: impl Into<String>) -> Self {
        Reference::new(LIST_TAB_ITEMS, tab_id)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Renders the embedded pointer form, `ref:kind:id`.
    pub fn pointer(&self) -> String {
        format!("{}{}", POINTER_PREFIX, self)
    }

    /// Parses an embedded pointer. Returns `None` for any string that is not one.
    pub fn from_pointer(s: &str) -> Option<Self> {
        s.strip_prefix(POINTER_PREFIX)?.parse().ok()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(Reference::new(kind, id)),
            _ => Err(Error::InvalidReference(s.to_string())),
        }
    }
}

impl From<Reference> for String {
    fn from(reference: Reference) -> Self {
        reference.to_string()
    }
}

impl TryFrom<String> for Reference {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

#[cfg(test)]
#[path = "reference_tests.rs"]
mod tests;
