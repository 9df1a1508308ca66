//! Optimistic locking guards.
//!
//! A versioned write carries the version it last read. The guard makes the
//! write fail at the store (as a conditional check failure) if another writer
//! got there first.

use crate::error::{OrmError, OrmResult};
use crate::expression::{ConditionNode, field};
use crate::schema::Schema;

/// Build the guard and next version for a write that last saw `current`.
///
/// With no current version the record must not exist yet and the next
/// version is 1; otherwise the stored version must still equal `current`.
pub fn build_version_guard(schema: &Schema, current: Option<i64>) -> OrmResult<(ConditionNode, i64)> {
    let version = schema
        .version_field()
        .ok_or_else(|| OrmError::NoVersionField(schema.table_name().to_owned()))?;
    let path = version.logical_name();

    Ok(match current {
        None => (field(path).not_exists(), 1),
        Some(n) => {
            let next = n.checked_add(1).ok_or_else(|| OrmError::VersionOverflow {
                field: path.to_owned(),
                current: n,
            })?;
            (field(path).eq(n), next)
        }
    })
}

/// Combine a caller condition with a version guard.
#[must_use]
pub fn guard_with(condition: Option<ConditionNode>, guard: ConditionNode) -> ConditionNode {
    match condition {
        Some(condition) => condition.and(guard),
        None => guard,
    }
}
