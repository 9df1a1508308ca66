//! Shared enums and the opaque pagination cursor.
//!
//! Enum variants use idiomatic Rust `PascalCase` naming with `#[serde(rename)]`
//! attributes mapping to the `SCREAMING_SNAKE_CASE` wire format.

use serde::{Deserialize, Serialize};

use crate::attribute_value::Item;

/// Opaque continuation marker returned by the store after a partial page.
///
/// dynorm stores and forwards it verbatim; the inner map is whatever the
/// gateway produced (for a DynamoDB-shaped store, the last evaluated key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(Item);

impl PageCursor {
    /// Wrap a continuation key produced by the store.
    #[must_use]
    pub fn new(key: Item) -> Self {
        Self(key)
    }

    /// Borrow the raw continuation key, for gateways that must send it back.
    #[must_use]
    pub fn as_item(&self) -> &Item {
        &self.0
    }

    /// Consume the cursor, returning the raw continuation key.
    #[must_use]
    pub fn into_item(self) -> Item {
        self.0
    }
}

/// Read consistency attached to every round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Consistency {
    /// Eventually consistent read.
    #[default]
    #[serde(rename = "EVENTUAL")]
    Eventual,
    /// Strongly consistent read.
    #[serde(rename = "STRONG")]
    Strong,
}

impl Consistency {
    /// Whether the read must be strongly consistent.
    #[must_use]
    pub fn is_strong(self) -> bool {
        matches!(self, Self::Strong)
    }
}

impl From<bool> for Consistency {
    fn from(consistent_read: bool) -> Self {
        if consistent_read {
            Self::Strong
        } else {
            Self::Eventual
        }
    }
}

/// Determines what values are returned by write operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReturnValue {
    /// Nothing is returned.
    #[default]
    #[serde(rename = "NONE")]
    None,
    /// All attributes as they appeared before the write.
    #[serde(rename = "ALL_OLD")]
    AllOld,
    /// Only the updated attributes as they appeared before the write.
    #[serde(rename = "UPDATED_OLD")]
    UpdatedOld,
    /// All attributes as they appear after the write.
    #[serde(rename = "ALL_NEW")]
    AllNew,
    /// Only the updated attributes as they appear after the write.
    #[serde(rename = "UPDATED_NEW")]
    UpdatedNew,
}

impl ReturnValue {
    /// Returns the wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::AllOld => "ALL_OLD",
            Self::UpdatedOld => "UPDATED_OLD",
            Self::AllNew => "ALL_NEW",
            Self::UpdatedNew => "UPDATED_NEW",
        }
    }
}

impl std::fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes to retrieve in a query or scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Select {
    /// All attributes of the item.
    #[default]
    #[serde(rename = "ALL_ATTRIBUTES")]
    AllAttributes,
    /// Only the attributes named by the projection expression.
    #[serde(rename = "SPECIFIC_ATTRIBUTES")]
    SpecificAttributes,
    /// Only the count of matching items.
    #[serde(rename = "COUNT")]
    Count,
}
