//! Update expression compilation.
//!
//! Operations are grouped by clause and emitted in the fixed order
//! `SET`, `REMOVE`, `ADD`, `DELETE`; within a clause, caller order is kept.

use std::collections::{BTreeMap, HashSet};

use dynorm_model::AttributeValue;
use tracing::trace;

use super::ast::{AttributePath, ConditionNode, UpdateClause, UpdateOperation};
use super::compiler::{ExpressionCompiler, ExpressionError};
use super::placeholder::PlaceholderTable;

/// Output of [`ExpressionCompiler::compile_update`].
#[derive(Debug, Clone)]
pub struct CompiledUpdate {
    /// The `SET ... REMOVE ... ADD ... DELETE ...` text.
    pub update_expression: String,
    /// Compiled guard, if one was supplied.
    pub condition_expression: Option<String>,
    /// Placeholders shared by both expressions.
    pub placeholders: PlaceholderTable,
}

impl ExpressionCompiler<'_> {
    /// Compile an update batch and optional guard into a fresh table.
    pub fn compile_update(
        &self,
        ops: &[UpdateOperation],
        guard: Option<&ConditionNode>,
    ) -> Result<CompiledUpdate, ExpressionError> {
        let mut placeholders = PlaceholderTable::new();
        let update_expression = self.compile_update_into(ops, &mut placeholders)?;
        let condition_expression = guard
            .map(|g| self.compile_condition(g, &mut placeholders))
            .transpose()?;
        Ok(CompiledUpdate {
            update_expression,
            condition_expression,
            placeholders,
        })
    }

    /// Compile an update batch into an existing table.
    ///
    /// Fails with `EmptyUpdate` when `ops` is empty and with
    /// `ConflictingUpdate` when two operations target the same stored path.
    /// Only identical paths conflict here: a parent and one of its children
    /// (`address` and `address.city`) compile, and the store rejects them.
    pub fn compile_update_into(
        &self,
        ops: &[UpdateOperation],
        table: &mut PlaceholderTable,
    ) -> Result<String, ExpressionError> {
        if ops.is_empty() {
            return Err(ExpressionError::EmptyUpdate);
        }

        let mut seen = HashSet::with_capacity(ops.len());
        for op in ops {
            let parsed = AttributePath::parse(op.path())?;
            let stored = self.schema().resolve_path(&parsed)?.to_string();
            if !seen.insert(stored.clone()) {
                return Err(ExpressionError::ConflictingUpdate { path: stored });
            }
        }

        let mut clauses: BTreeMap<UpdateClause, Vec<String>> = BTreeMap::new();
        for op in ops {
            let action = self.compile_action(op, table)?;
            clauses.entry(op.clause()).or_default().push(action);
        }

        let text = clauses
            .into_iter()
            .map(|(clause, actions)| format!("{clause} {}", actions.join(", ")))
            .collect::<Vec<_>>()
            .join(" ");
        trace!(update_expression = %text, "compiled update");
        Ok(text)
    }

    fn compile_action(
        &self,
        op: &UpdateOperation,
        table: &mut PlaceholderTable,
    ) -> Result<String, ExpressionError> {
        let p = self.compile_path(op.path(), table)?;
        let action = match op {
            UpdateOperation::Set { value, .. } => {
                format!("{p} = {}", table.value_token(value))
            }
            UpdateOperation::SetIfNotExists { value, .. } => {
                format!("{p} = if_not_exists({p}, {})", table.value_token(value))
            }
            UpdateOperation::AppendToList { values, .. } => {
                let v = table.value_token(&AttributeValue::L(values.clone()));
                format!("{p} = list_append({p}, {v})")
            }
            UpdateOperation::PrependToList { values, .. } => {
                let v = table.value_token(&AttributeValue::L(values.clone()));
                format!("{p} = list_append({v}, {p})")
            }
            UpdateOperation::Remove(_) => p,
            UpdateOperation::Increment { delta: value, .. }
            | UpdateOperation::AddToSet {
                elements: value, ..
            }
            | UpdateOperation::DeleteFromSet {
                elements: value, ..
            } => format!("{p} {}", table.value_token(value)),
        };
        Ok(action)
    }
}
