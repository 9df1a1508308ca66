//! Gateway responses consumed by the pagination engine and write path.

use serde::{Deserialize, Serialize};

use crate::attribute_value::Item;
use crate::types::PageCursor;

/// One page of a query or scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadPage {
    /// Records in this page, keyed by stored attribute names.
    #[serde(default)]
    pub items: Vec<Item>,

    /// Number of records in the page after filtering. When the request asked
    /// for `Select::Count` the items are empty and only this is meaningful.
    pub count: u32,

    /// Number of records evaluated before filtering.
    pub scanned_count: u32,

    /// Continuation cursor, or `None` once the partition/index/table is
    /// exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<PageCursor>,
}

impl ReadPage {
    /// Build a page whose counts match its items.
    #[must_use]
    pub fn new(items: Vec<Item>, last_evaluated_key: Option<PageCursor>) -> Self {
        let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
        Self {
            items,
            count,
            scanned_count: count,
            last_evaluated_key,
        }
    }

    /// Whether the store signalled exhaustion.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.last_evaluated_key.is_none()
    }
}

/// Result of a single-record read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemOutput {
    /// The record, keyed by stored names; `None` when no record has the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

/// Acknowledgement of a single-record write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WriteOutput {
    /// Attributes requested through `ReturnValue`, keyed by stored names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,
}
