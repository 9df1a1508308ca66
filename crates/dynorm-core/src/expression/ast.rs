//! Condition and update trees built by callers against logical field names.
//!
//! Both trees are closed enums: the compiler walks them with a `match`, so
//! adding a variant forces every consumer to handle it. Paths are kept as the
//! caller wrote them and parsed into [`AttributePath`] at compile time, which
//! keeps tree construction infallible.

use std::fmt;

use dynorm_model::AttributeValue;

use super::compiler::ExpressionError;

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// A document path consisting of one or more elements.
///
/// The first element is always a named attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    elements: Vec<PathElement>,
}

/// A single element in an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// A named attribute or map key.
    Attribute(String),
    /// A list index dereference (e.g., `[0]`).
    Index(usize),
}

impl AttributePath {
    /// Parse a dotted path such as `address.city` or `tags[0].label`.
    pub fn parse(raw: &str) -> Result<Self, ExpressionError> {
        let invalid = |reason: &str| ExpressionError::InvalidPath {
            path: raw.to_owned(),
            reason: reason.to_owned(),
        };

        let mut elements = Vec::new();
        for part in raw.split('.') {
            let (name, mut rest) = match part.find('[') {
                Some(i) => part.split_at(i),
                None => (part, ""),
            };
            if name.is_empty() {
                return Err(invalid("empty path segment"));
            }
            elements.push(PathElement::Attribute(name.to_owned()));

            while !rest.is_empty() {
                let Some(stripped) = rest.strip_prefix('[') else {
                    return Err(invalid("unexpected characters after list index"));
                };
                let Some(close) = stripped.find(']') else {
                    return Err(invalid("unclosed list index"));
                };
                let index = stripped[..close]
                    .parse::<usize>()
                    .map_err(|_| invalid("list index must be a non-negative integer"))?;
                elements.push(PathElement::Index(index));
                rest = &stripped[close + 1..];
            }
        }

        Ok(Self { elements })
    }

    /// The leading attribute name, the only segment subject to aliasing.
    #[must_use]
    pub fn leading(&self) -> &str {
        match self.elements.first() {
            Some(PathElement::Attribute(name)) => name,
            _ => unreachable!("attribute paths always start with a name"),
        }
    }

    /// A copy of this path with the leading segment renamed.
    #[must_use]
    pub fn with_leading(&self, name: &str) -> Self {
        let mut elements = self.elements.clone();
        elements[0] = PathElement::Attribute(name.to_owned());
        Self { elements }
    }

    /// All path elements in order.
    #[must_use]
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// `true` when the path names a top-level attribute only.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.elements.len() == 1
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, elem) in self.elements.iter().enumerate() {
            match elem {
                PathElement::Attribute(name) => {
                    if i > 0 {
                        write!(f, ".{name}")?;
                    } else {
                        write!(f, "{name}")?;
                    }
                }
                PathElement::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (`=`).
    Eq,
    /// Not equal (`<>`).
    Ne,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "<>"),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// A condition tree over logical paths.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    /// `path op operand`.
    Comparison {
        /// Logical path.
        path: String,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand literal.
        operand: AttributeValue,
    },
    /// `attribute_exists(path)`.
    Exists(String),
    /// `attribute_not_exists(path)`.
    NotExists(String),
    /// `begins_with(path, prefix)`.
    BeginsWith {
        /// Logical path.
        path: String,
        /// Prefix literal.
        prefix: AttributeValue,
    },
    /// `path BETWEEN lower AND upper` (inclusive).
    Between {
        /// Logical path.
        path: String,
        /// Lower bound.
        lower: AttributeValue,
        /// Upper bound.
        upper: AttributeValue,
    },
    /// `contains(path, operand)`: substring or set/list membership.
    Contains {
        /// Logical path.
        path: String,
        /// Element or substring literal.
        operand: AttributeValue,
    },
    /// `path IN (a, b, ...)`.
    In {
        /// Logical path.
        path: String,
        /// Candidate literals.
        operands: Vec<AttributeValue>,
    },
    /// `NOT (node)`.
    Not(Box<ConditionNode>),
    /// `(left) AND (right)`.
    And(Box<ConditionNode>, Box<ConditionNode>),
    /// `(left) OR (right)`.
    Or(Box<ConditionNode>, Box<ConditionNode>),
}

impl ConditionNode {
    /// Conjunction of `self` and `other`.
    #[must_use]
    pub fn and(self, other: ConditionNode) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Disjunction of `self` and `other`.
    #[must_use]
    pub fn or(self, other: ConditionNode) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Conjunction with an optional second condition.
    #[must_use]
    pub fn and_maybe(self, other: Option<ConditionNode>) -> Self {
        match other {
            Some(other) => self.and(other),
            None => self,
        }
    }

    /// Fold a sequence of conditions with `AND`. Returns `None` when empty.
    pub fn all(conditions: impl IntoIterator<Item = ConditionNode>) -> Option<Self> {
        conditions.into_iter().reduce(Self::and)
    }

    /// Visit the logical path of every leaf in evaluation order.
    pub fn for_each_path<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Self::Comparison { path, .. }
            | Self::Exists(path)
            | Self::NotExists(path)
            | Self::BeginsWith { path, .. }
            | Self::Between { path, .. }
            | Self::Contains { path, .. }
            | Self::In { path, .. } => f(path),
            Self::Not(inner) => inner.for_each_path(f),
            Self::And(left, right) | Self::Or(left, right) => {
                left.for_each_path(f);
                right.for_each_path(f);
            }
        }
    }
}

impl std::ops::Not for ConditionNode {
    type Output = ConditionNode;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

// ---------------------------------------------------------------------------
// Update operations
// ---------------------------------------------------------------------------

/// The clause an update operation is emitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UpdateClause {
    /// Assignments, list appends and `if_not_exists`.
    Set,
    /// Attribute removal.
    Remove,
    /// Numeric deltas and set additions.
    Add,
    /// Set element removal.
    Delete,
}

impl fmt::Display for UpdateClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => write!(f, "SET"),
            Self::Remove => write!(f, "REMOVE"),
            Self::Add => write!(f, "ADD"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single mutation against one logical path.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// `SET path = value`.
    Set {
        /// Logical path.
        path: String,
        /// New value.
        value: AttributeValue,
    },
    /// `ADD path delta` on a number.
    Increment {
        /// Logical path.
        path: String,
        /// Numeric delta (may be negative).
        delta: AttributeValue,
    },
    /// `REMOVE path`.
    Remove(String),
    /// `SET path = list_append(path, values)`.
    AppendToList {
        /// Logical path.
        path: String,
        /// Elements appended at the end.
        values: Vec<AttributeValue>,
    },
    /// `SET path = list_append(values, path)`.
    PrependToList {
        /// Logical path.
        path: String,
        /// Elements inserted at the front.
        values: Vec<AttributeValue>,
    },
    /// `SET path = if_not_exists(path, value)`.
    SetIfNotExists {
        /// Logical path.
        path: String,
        /// Value written only when the attribute is absent.
        value: AttributeValue,
    },
    /// `ADD path set` on a string/number/binary set.
    AddToSet {
        /// Logical path.
        path: String,
        /// Set of elements to add.
        elements: AttributeValue,
    },
    /// `DELETE path set`.
    DeleteFromSet {
        /// Logical path.
        path: String,
        /// Set of elements to remove.
        elements: AttributeValue,
    },
}

impl UpdateOperation {
    /// The logical path this operation mutates.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. }
            | Self::Increment { path, .. }
            | Self::Remove(path)
            | Self::AppendToList { path, .. }
            | Self::PrependToList { path, .. }
            | Self::SetIfNotExists { path, .. }
            | Self::AddToSet { path, .. }
            | Self::DeleteFromSet { path, .. } => path,
        }
    }

    /// The clause keyword this operation is grouped under.
    #[must_use]
    pub fn clause(&self) -> UpdateClause {
        match self {
            Self::Set { .. }
            | Self::AppendToList { .. }
            | Self::PrependToList { .. }
            | Self::SetIfNotExists { .. } => UpdateClause::Set,
            Self::Remove(_) => UpdateClause::Remove,
            Self::Increment { .. } | Self::AddToSet { .. } => UpdateClause::Add,
            Self::DeleteFromSet { .. } => UpdateClause::Delete,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder sugar
// ---------------------------------------------------------------------------

/// Entry point for building conditions and updates on a logical path.
///
/// ```
/// use dynorm_core::expression::field;
///
/// let cond = field("status").eq("active").and(field("age").ge(18_i64));
/// let op = field("login_count").increment(1_i64);
/// # let _ = (cond, op);
/// ```
#[must_use]
pub fn field(path: impl Into<String>) -> Path {
    Path::new(path)
}

/// A logical path awaiting an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    path: String,
}

impl Path {
    /// Start a condition or update on `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn compare(self, op: CompareOp, operand: impl Into<AttributeValue>) -> ConditionNode {
        ConditionNode::Comparison {
            path: self.path,
            op,
            operand: operand.into(),
        }
    }

    /// `path = value`.
    #[must_use]
    pub fn eq(self, value: impl Into<AttributeValue>) -> ConditionNode {
        self.compare(CompareOp::Eq, value)
    }

    /// `path <> value`.
    #[must_use]
    pub fn ne(self, value: impl Into<AttributeValue>) -> ConditionNode {
        self.compare(CompareOp::Ne, value)
    }

    /// `path < value`.
    #[must_use]
    pub fn lt(self, value: impl Into<AttributeValue>) -> ConditionNode {
        self.compare(CompareOp::Lt, value)
    }

    /// `path <= value`.
    #[must_use]
    pub fn le(self, value: impl Into<AttributeValue>) -> ConditionNode {
        self.compare(CompareOp::Le, value)
    }

    /// `path > value`.
    #[must_use]
    pub fn gt(self, value: impl Into<AttributeValue>) -> ConditionNode {
        self.compare(CompareOp::Gt, value)
    }

    /// `path >= value`.
    #[must_use]
    pub fn ge(self, value: impl Into<AttributeValue>) -> ConditionNode {
        self.compare(CompareOp::Ge, value)
    }

    /// `attribute_exists(path)`.
    #[must_use]
    pub fn exists(self) -> ConditionNode {
        ConditionNode::Exists(self.path)
    }

    /// `attribute_not_exists(path)`.
    #[must_use]
    pub fn not_exists(self) -> ConditionNode {
        ConditionNode::NotExists(self.path)
    }

    /// `begins_with(path, prefix)`.
    #[must_use]
    pub fn begins_with(self, prefix: impl Into<AttributeValue>) -> ConditionNode {
        ConditionNode::BeginsWith {
            path: self.path,
            prefix: prefix.into(),
        }
    }

    /// `path BETWEEN lower AND upper`.
    #[must_use]
    pub fn between(
        self,
        lower: impl Into<AttributeValue>,
        upper: impl Into<AttributeValue>,
    ) -> ConditionNode {
        ConditionNode::Between {
            path: self.path,
            lower: lower.into(),
            upper: upper.into(),
        }
    }

    /// `contains(path, operand)`.
    #[must_use]
    pub fn contains(self, operand: impl Into<AttributeValue>) -> ConditionNode {
        ConditionNode::Contains {
            path: self.path,
            operand: operand.into(),
        }
    }

    /// `path IN (...)`.
    #[must_use]
    pub fn is_in<V: Into<AttributeValue>>(self, values: impl IntoIterator<Item = V>) -> ConditionNode {
        ConditionNode::In {
            path: self.path,
            operands: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Assign a value.
    #[must_use]
    pub fn set(self, value: impl Into<AttributeValue>) -> UpdateOperation {
        UpdateOperation::Set {
            path: self.path,
            value: value.into(),
        }
    }

    /// Add a numeric delta.
    #[must_use]
    pub fn increment(self, delta: impl Into<AttributeValue>) -> UpdateOperation {
        UpdateOperation::Increment {
            path: self.path,
            delta: delta.into(),
        }
    }

    /// Remove the attribute.
    #[must_use]
    pub fn remove(self) -> UpdateOperation {
        UpdateOperation::Remove(self.path)
    }

    /// Append elements to a list.
    #[must_use]
    pub fn append<V: Into<AttributeValue>>(self, values: impl IntoIterator<Item = V>) -> UpdateOperation {
        UpdateOperation::AppendToList {
            path: self.path,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Prepend elements to a list.
    #[must_use]
    pub fn prepend<V: Into<AttributeValue>>(self, values: impl IntoIterator<Item = V>) -> UpdateOperation {
        UpdateOperation::PrependToList {
            path: self.path,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Assign a value only if the attribute is absent.
    #[must_use]
    pub fn set_if_not_exists(self, value: impl Into<AttributeValue>) -> UpdateOperation {
        UpdateOperation::SetIfNotExists {
            path: self.path,
            value: value.into(),
        }
    }

    /// Add elements to a set attribute.
    #[must_use]
    pub fn add_to_set(self, elements: AttributeValue) -> UpdateOperation {
        UpdateOperation::AddToSet {
            path: self.path,
            elements,
        }
    }

    /// Remove elements from a set attribute.
    #[must_use]
    pub fn delete_from_set(self, elements: AttributeValue) -> UpdateOperation {
        UpdateOperation::DeleteFromSet {
            path: self.path,
            elements,
        }
    }
}
