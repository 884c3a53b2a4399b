// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Normalization of favorites collection responses.
//!
//! Different backend versions answer `GET` with different item shapes. Each
//! shape is one variant of [`CollectionItem`] with its own normalizer; the
//! collection is the list of ids those normalizers produce.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use crate::types::MemberId;

/// An id as it appears on the wire: a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// String id.
    Text(String),
    /// Unsigned numeric id.
    Unsigned(u64),
    /// Signed numeric id.
    Signed(i64),
}

impl RawId {
    fn into_member_id(self) -> Option<MemberId> {
        match self {
            Self::Text(s) if s.is_empty() => None,
            Self::Text(s) => Some(MemberId::new(s)),
            Self::Unsigned(n) => Some(MemberId::from(n)),
            Self::Signed(n) => Some(MemberId::from(n)),
        }
    }
}

/// Record exposing a member id field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemberRecord {
    /// The favorited entity's id.
    #[serde(
        rename = "memberId",
        alias = "member_id",
        alias = "productId",
        alias = "product_id"
    )]
    pub member_id: RawId,
}

/// Entity carried inside a [`NestedRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entity {
    /// The entity's id.
    pub id: RawId,
}

/// Record exposing a nested entity with an id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NestedRecord {
    /// The favorited entity.
    #[serde(alias = "entity", alias = "item")]
    pub product: Entity,
}

/// One element of the favorites collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CollectionItem {
    /// A bare id: `"p1"` or `17`.
    Bare(RawId),
    /// `{ "memberId": "p1" }`
    Record(MemberRecord),
    /// `{ "product": { "id": "p1" } }`
    Nested(NestedRecord),
}

impl CollectionItem {
    /// Extracts the member id of this element.
    #[must_use]
    pub fn into_member_id(self) -> Option<MemberId> {
        match self {
            Self::Bare(id) => id.into_member_id(),
            Self::Record(record) => record.member_id.into_member_id(),
            Self::Nested(record) => record.product.id.into_member_id(),
        }
    }
}

/// Normalizes a collection document into a duplicate-free id list.
///
/// Accepts `{ "items": [...] }` or a bare array. Elements that match no known
/// shape are skipped; a document that is not a collection yields an empty
/// list.
#[must_use]
pub fn normalize_collection(doc: &Value) -> Vec<MemberId> {
    let items = match doc {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("items") {
            Some(Value::Array(items)) => items,
            _ => {
                tracing::warn!("collection document has no items array");
                return Vec::new();
            }
        },
        _ => {
            tracing::warn!("unrecognized collection document");
            return Vec::new();
        }
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        match CollectionItem::deserialize(item) {
            Ok(item) => match item.into_member_id() {
                Some(id) if seen.insert(id.clone()) => ids.push(id),
                _ => {}
            },
            Err(_) => tracing::debug!(?item, "skipping unrecognized collection item"),
        }
    }
    ids
}

/// Envelope returned by `POST`/`DELETE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MutationEnvelope {
    /// `true` on success.
    #[serde(default)]
    pub ok: Option<bool>,
    /// Error message on failure.
    #[serde(default)]
    pub error: Option<String>,
}

impl MutationEnvelope {
    /// Error message if the envelope reports failure.
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        match (&self.error, self.ok) {
            (Some(error), _) => Some(error.clone()),
            (None, Some(false)) => Some("server reported failure".to_string()),
            _ => None,
        }
    }
}
