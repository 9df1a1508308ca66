//! Expiry timestamps for fields declared with [`ValueKind::Ttl`].
//!
//! The store expects whole epoch seconds in a number attribute.
//!
//! [`ValueKind::Ttl`]: crate::schema::ValueKind::Ttl

use chrono::{DateTime, TimeDelta, Utc};
use dynorm_model::{AttributeValue, Item};

use crate::schema::Schema;

/// Encode an absolute expiry.
#[must_use]
pub fn expires_at(at: DateTime<Utc>) -> AttributeValue {
    AttributeValue::from(at.timestamp())
}

/// Encode an expiry `after` from `now`.
#[must_use]
pub fn expires_in(now: DateTime<Utc>, after: TimeDelta) -> AttributeValue {
    expires_at(now + after)
}

/// Decode an expiry attribute.
#[must_use]
pub fn expiry_of(value: &AttributeValue) -> Option<DateTime<Utc>> {
    value
        .as_i64()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Whether a logical record has passed its TTL at `now`. Records without a
/// TTL field or value never expire.
///
/// The store deletes expired records lazily, so reads may still return them.
#[must_use]
pub fn is_expired(schema: &Schema, item: &Item, now: DateTime<Utc>) -> bool {
    schema
        .ttl_field()
        .and_then(|field| item.get(field.logical_name()))
        .and_then(expiry_of)
        .is_some_and(|at| at <= now)
}
