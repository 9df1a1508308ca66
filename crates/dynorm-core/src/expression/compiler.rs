//! Recursive-descent compilation of condition trees into expression text.
//!
//! The compiler owns no state beyond the schema it resolves against; the
//! [`PlaceholderTable`] is threaded explicitly so that key condition, filter,
//! projection, guard and update of one call share a single token space.

use dynorm_model::AttributeValue;
use tracing::trace;

use super::ast::{AttributePath, CompareOp, ConditionNode, PathElement};
use super::placeholder::PlaceholderTable;
use crate::schema::Schema;

/// Errors raised while compiling expressions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// The leading segment of a path names no declared field.
    #[error("unknown attribute '{segment}' in path '{path}'")]
    UnknownAttribute {
        /// The full path as written.
        path: String,
        /// The unresolved leading segment.
        segment: String,
    },

    /// The path text is malformed.
    #[error("invalid attribute path '{path}': {reason}")]
    InvalidPath {
        /// The path as written.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two update operations target the same stored path.
    #[error("conflicting update operations on path '{path}'")]
    ConflictingUpdate {
        /// The stored path targeted twice.
        path: String,
    },

    /// An update was requested with no operations.
    #[error("update requires at least one operation")]
    EmptyUpdate,

    /// A key condition uses a disallowed operator or attribute.
    #[error("invalid key condition: {0}")]
    InvalidKeyCondition(String),

    /// An operand list the store cannot accept.
    #[error("invalid operands for path '{path}': {reason}")]
    InvalidOperand {
        /// The path the operands apply to.
        path: String,
        /// What is wrong with them.
        reason: String,
    },
}

/// Compiles condition trees, paths and projections against one schema.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionCompiler<'s> {
    schema: &'s Schema,
}

impl<'s> ExpressionCompiler<'s> {
    /// Create a compiler resolving names through `schema`.
    #[must_use]
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// The schema names are resolved against.
    #[must_use]
    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Compile a logical path into placeholder form, e.g. `#n0.#n1[2]`.
    pub fn compile_path(
        &self,
        logical_path: &str,
        table: &mut PlaceholderTable,
    ) -> Result<String, ExpressionError> {
        let parsed = AttributePath::parse(logical_path)?;
        let stored = self.schema.resolve_path(&parsed)?;
        Ok(render_path(&stored, table))
    }

    /// Compile a condition tree into expression text.
    pub fn compile_condition(
        &self,
        node: &ConditionNode,
        table: &mut PlaceholderTable,
    ) -> Result<String, ExpressionError> {
        let text = match node {
            ConditionNode::Comparison { path, op, operand } => {
                let p = self.compile_path(path, table)?;
                let v = table.value_token(operand);
                format!("{p} {op} {v}")
            }
            ConditionNode::Exists(path) => {
                format!("attribute_exists({})", self.compile_path(path, table)?)
            }
            ConditionNode::NotExists(path) => {
                format!("attribute_not_exists({})", self.compile_path(path, table)?)
            }
            ConditionNode::BeginsWith { path, prefix } => {
                let p = self.compile_path(path, table)?;
                let v = table.value_token(prefix);
                format!("begins_with({p}, {v})")
            }
            ConditionNode::Between { path, lower, upper } => {
                let p = self.compile_path(path, table)?;
                let lo = table.value_token(lower);
                let hi = table.value_token(upper);
                format!("{p} BETWEEN {lo} AND {hi}")
            }
            ConditionNode::Contains { path, operand } => {
                let p = self.compile_path(path, table)?;
                let v = table.value_token(operand);
                format!("contains({p}, {v})")
            }
            ConditionNode::In { path, operands } => {
                if operands.is_empty() {
                    return Err(ExpressionError::InvalidOperand {
                        path: path.clone(),
                        reason: "IN requires at least one operand".to_owned(),
                    });
                }
                let p = self.compile_path(path, table)?;
                let tokens: Vec<String> = operands.iter().map(|v| table.value_token(v)).collect();
                format!("{p} IN ({})", tokens.join(", "))
            }
            ConditionNode::Not(inner) => {
                format!("NOT ({})", self.compile_condition(inner, table)?)
            }
            ConditionNode::And(left, right) => {
                let l = self.compile_condition(left, table)?;
                let r = self.compile_condition(right, table)?;
                format!("({l}) AND ({r})")
            }
            ConditionNode::Or(left, right) => {
                let l = self.compile_condition(left, table)?;
                let r = self.compile_condition(right, table)?;
                format!("({l}) OR ({r})")
            }
        };
        Ok(text)
    }

    /// Compile a projection list into comma-joined placeholder paths.
    pub fn compile_projection<S: AsRef<str>>(
        &self,
        logical_paths: &[S],
        table: &mut PlaceholderTable,
    ) -> Result<String, ExpressionError> {
        let mut rendered: Vec<String> = Vec::with_capacity(logical_paths.len());
        for path in logical_paths {
            let p = self.compile_path(path.as_ref(), table)?;
            if !rendered.contains(&p) {
                rendered.push(p);
            }
        }
        let text = rendered.join(", ");
        trace!(projection = %text, "compiled projection");
        Ok(text)
    }

    /// Compile a query key condition: partition key equality, optionally
    /// joined with a sort key condition.
    ///
    /// The sort condition must reference only `sort_key` and use `=`, `<`,
    /// `<=`, `>`, `>=`, `begins_with` or `BETWEEN`.
    pub fn compile_key_condition(
        &self,
        partition_key: &str,
        partition_value: &AttributeValue,
        sort_key: Option<&str>,
        sort_condition: Option<&ConditionNode>,
        table: &mut PlaceholderTable,
    ) -> Result<String, ExpressionError> {
        let p = self.compile_path(partition_key, table)?;
        let v = table.value_token(partition_value);
        let pk_text = format!("{p} = {v}");

        let Some(condition) = sort_condition else {
            trace!(key_condition = %pk_text, "compiled key condition");
            return Ok(pk_text);
        };

        let Some(sort_key) = sort_key else {
            return Err(ExpressionError::InvalidKeyCondition(
                "sort key condition given but the target has no sort key".to_owned(),
            ));
        };
        validate_sort_condition(condition, sort_key)?;

        let sk_text = self.compile_condition(condition, table)?;
        let text = format!("({pk_text}) AND ({sk_text})");
        trace!(key_condition = %text, "compiled key condition");
        Ok(text)
    }
}

fn validate_sort_condition(condition: &ConditionNode, sort_key: &str) -> Result<(), ExpressionError> {
    let path = match condition {
        ConditionNode::Comparison { op: CompareOp::Ne, .. } => {
            return Err(ExpressionError::InvalidKeyCondition(
                "'<>' is not allowed on a sort key".to_owned(),
            ));
        }
        ConditionNode::Comparison { path, .. }
        | ConditionNode::BeginsWith { path, .. }
        | ConditionNode::Between { path, .. } => path,
        other => {
            return Err(ExpressionError::InvalidKeyCondition(format!(
                "unsupported sort key operator in {other:?}"
            )));
        }
    };
    if path != sort_key {
        return Err(ExpressionError::InvalidKeyCondition(format!(
            "sort key condition references '{path}', expected '{sort_key}'"
        )));
    }
    Ok(())
}

fn render_path(path: &AttributePath, table: &mut PlaceholderTable) -> String {
    let mut out = String::new();
    for (i, elem) in path.elements().iter().enumerate() {
        match elem {
            PathElement::Attribute(name) => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(&table.name_token(name));
            }
            PathElement::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
        }
    }
    out
}
