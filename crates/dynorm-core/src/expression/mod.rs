//! Condition, projection, key condition and update expressions.
//!
//! Callers build [`ConditionNode`] and [`UpdateOperation`] trees over logical
//! names; the [`ExpressionCompiler`] resolves aliases through the schema and
//! renders placeholder-only text together with a [`PlaceholderTable`].

pub mod ast;
pub mod compiler;
pub mod placeholder;
pub mod update;

pub use ast::{
    AttributePath, CompareOp, ConditionNode, Path, PathElement, UpdateClause, UpdateOperation,
    field,
};
pub use compiler::{ExpressionCompiler, ExpressionError};
pub use placeholder::PlaceholderTable;
pub use update::CompiledUpdate;
