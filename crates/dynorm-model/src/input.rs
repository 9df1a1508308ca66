//! Compiled request artifacts handed to the storage gateway.
//!
//! These carry only expression text and the two placeholder maps; the gateway
//! never sees condition or update trees. Field naming follows the store's
//! `PascalCase` JSON protocol, and empty maps and `None` fields are omitted so
//! a gateway can forward the serialized form directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::{AttributeValue, Item};
use crate::types::{PageCursor, ReturnValue, Select};

/// Compiled `Query` round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    /// The table to query.
    pub table_name: String,

    /// Secondary index to query instead of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// Partition key equality, optionally joined with a sort key condition.
    pub key_condition_expression: String,

    /// Condition applied to matched records before they are returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Attributes to retrieve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Name placeholder token to stored attribute name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Value placeholder token to literal.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// `true` (default) for ascending sort key order.
    pub scan_index_forward: bool,

    /// Records requested by this round trip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Continuation cursor from the previous round trip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<PageCursor>,

    /// What to return for each match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Select>,

    /// Strongly consistent read.
    pub consistent_read: bool,
}

/// Compiled `Scan` round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInput {
    /// The table to scan.
    pub table_name: String,

    /// Secondary index to scan instead of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// Condition applied to scanned records before they are returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Attributes to retrieve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Name placeholder token to stored attribute name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Value placeholder token to literal.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// Records requested by this round trip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Continuation cursor from the previous round trip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<PageCursor>,

    /// Segment scanned by this worker in a parallel scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<u32>,

    /// Total number of segments in a parallel scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_segments: Option<u32>,

    /// What to return for each match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Select>,

    /// Strongly consistent read.
    pub consistent_read: bool,
}

/// Compiled `PutItem` write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    /// The table to write into.
    pub table_name: String,

    /// The full record, keyed by stored attribute names.
    pub item: Item,

    /// Guard that must hold for the put to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Name placeholder token to stored attribute name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Value placeholder token to literal.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// Attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

/// Compiled `UpdateItem` write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemInput {
    /// The table containing the record.
    pub table_name: String,

    /// Primary key of the record, keyed by stored attribute names.
    pub key: Item,

    /// `SET`/`REMOVE`/`ADD`/`DELETE` clauses.
    pub update_expression: String,

    /// Guard that must hold for the update to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Name placeholder token to stored attribute name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Value placeholder token to literal.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// Attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

/// Compiled `GetItem` read of a single record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemInput {
    /// The table containing the record.
    pub table_name: String,

    /// Primary key of the record, keyed by stored attribute names.
    pub key: Item,

    /// Attributes to return; all when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Name placeholder token to stored attribute name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Strongly consistent read.
    pub consistent_read: bool,
}

/// Compiled `DeleteItem` write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemInput {
    /// The table containing the record.
    pub table_name: String,

    /// Primary key of the record, keyed by stored attribute names.
    pub key: Item,

    /// Guard that must hold for the delete to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Name placeholder token to stored attribute name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Value placeholder token to literal.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// Attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

/// Any single-record write handed to `issue_write`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteRequest {
    /// Create or replace a record.
    Put(PutItemInput),
    /// Mutate attributes of a record in place.
    Update(UpdateItemInput),
    /// Remove a record.
    Delete(DeleteItemInput),
}

impl WriteRequest {
    /// The table this write targets.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::Put(input) => &input.table_name,
            Self::Update(input) => &input.table_name,
            Self::Delete(input) => &input.table_name,
        }
    }

    /// The guard expression, if the write is conditional.
    #[must_use]
    pub fn condition_expression(&self) -> Option<&str> {
        match self {
            Self::Put(input) => input.condition_expression.as_deref(),
            Self::Update(input) => input.condition_expression.as_deref(),
            Self::Delete(input) => input.condition_expression.as_deref(),
        }
    }
}
