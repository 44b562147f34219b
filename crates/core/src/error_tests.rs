// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    validation = { Error::Validation("quantity must be positive".into()), "quantity must be positive" },
    not_found = { Error::NotFound("Tab:42".into()), "Tab:42" },
    invalid_reference = { Error::InvalidReference("nocolon".into()), "kind:id" },
    unknown_kind = { Error::UnknownKind("Spot".into()), "Spot" },
    cyclic = { Error::CyclicReference("Tab:1".into()), "cyclic" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn error_classification() {
    assert!(Error::Validation("x".into()).is_validation());
    assert!(!Error::Validation("x".into()).is_not_found());
    assert!(Error::NotFound("Tab:1".into()).is_not_found());
    assert!(!Error::CyclicReference("Tab:1".into()).is_validation());
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}
