//! Per-model schema: field declarations, aliasing, keys and indexes.
//!
//! A [`Schema`] is the explicit handle a caller builds once per model and
//! passes to every compile and decode call. It maps logical field names (what
//! the caller writes) to stored names (what the store holds) and back.

use std::collections::HashMap;
use std::fmt;

use dynorm_model::{AttributeValue, Item};

use crate::error::{OrmError, OrmResult};
use crate::expression::{AttributePath, ExpressionError};

/// Errors raised while declaring a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Two fields share a logical name.
    #[error("schema conflict: logical name '{0}' is already registered")]
    DuplicateLogicalName(String),

    /// Two fields share a stored name.
    #[error("schema conflict: stored name '{0}' is already registered")]
    DuplicateStoredName(String),

    /// A unique role (key, discriminator, version) is already held.
    #[error("schema conflict: {role} role is already held by '{existing}'")]
    RoleTaken {
        /// The contested role.
        role: FieldRole,
        /// Logical name of the current holder.
        existing: String,
    },

    /// Two indexes share a name.
    #[error("schema conflict: index '{0}' is already declared")]
    DuplicateIndex(String),

    /// An index refers to a field that is not declared.
    #[error("index '{index}' references undeclared field '{field}'")]
    UnknownIndexField {
        /// Index name.
        index: String,
        /// Missing logical field.
        field: String,
    },

    /// The schema has no partition key, so records cannot be addressed.
    #[error("schema for table '{0}' declares no partition key")]
    MissingPartitionKey(String),
}

/// What a field means to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldRole {
    /// Ordinary attribute.
    #[default]
    Plain,
    /// Table partition (hash) key.
    PartitionKey,
    /// Table sort (range) key.
    SortKey,
    /// Record-type tag used to route mixed collections.
    Discriminator,
    /// Optimistic locking counter.
    Version,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::PartitionKey => f.write_str("partition key"),
            Self::SortKey => f.write_str("sort key"),
            Self::Discriminator => f.write_str("discriminator"),
            Self::Version => f.write_str("version"),
        }
    }
}

/// Declared value kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// String.
    String,
    /// Number.
    Number,
    /// Binary blob.
    Binary,
    /// Boolean.
    Boolean,
    /// Ordered list; nested paths pass through.
    List,
    /// Map; nested paths pass through.
    Map,
    /// String set.
    StringSet,
    /// Number set.
    NumberSet,
    /// Binary set.
    BinarySet,
    /// Expiry timestamp stored as epoch seconds.
    Ttl,
}

impl ValueKind {
    /// Whether the kind declares a nested document structure.
    #[must_use]
    pub fn is_document(self) -> bool {
        matches!(self, Self::List | Self::Map)
    }
}

/// Declaration of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    logical_name: String,
    stored_name: String,
    role: FieldRole,
    value_kind: ValueKind,
    default_value: Option<AttributeValue>,
    nullable: bool,
}

impl FieldSchema {
    /// A nullable plain field stored under its logical name.
    #[must_use]
    pub fn new(logical_name: impl Into<String>, value_kind: ValueKind) -> Self {
        let logical_name = logical_name.into();
        Self {
            stored_name: logical_name.clone(),
            logical_name,
            role: FieldRole::Plain,
            value_kind,
            default_value: None,
            nullable: true,
        }
    }

    /// Shorthand for a string field.
    #[must_use]
    pub fn string(logical_name: impl Into<String>) -> Self {
        Self::new(logical_name, ValueKind::String)
    }

    /// Shorthand for a number field.
    #[must_use]
    pub fn number(logical_name: impl Into<String>) -> Self {
        Self::new(logical_name, ValueKind::Number)
    }

    /// Store the field under a different name.
    #[must_use]
    pub fn alias(mut self, stored_name: impl Into<String>) -> Self {
        self.stored_name = stored_name.into();
        self
    }

    /// Mark as the table partition key. Keys are never nullable.
    #[must_use]
    pub fn partition_key(self) -> Self {
        self.with_role(FieldRole::PartitionKey).required()
    }

    /// Mark as the table sort key. Keys are never nullable.
    #[must_use]
    pub fn sort_key(self) -> Self {
        self.with_role(FieldRole::SortKey).required()
    }

    /// Mark as the discriminator.
    #[must_use]
    pub fn discriminator(self) -> Self {
        self.with_role(FieldRole::Discriminator)
    }

    /// Mark as the optimistic locking counter.
    #[must_use]
    pub fn version(self) -> Self {
        self.with_role(FieldRole::Version)
    }

    /// Assign an explicit role.
    #[must_use]
    pub fn with_role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    /// Value written when the field is absent on encode.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<AttributeValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Reject encodes where the field is absent or null.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Logical (caller-facing) name.
    #[must_use]
    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    /// Stored (on-disk) name.
    #[must_use]
    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    /// Role in the table.
    #[must_use]
    pub fn role(&self) -> FieldRole {
        self.role
    }

    /// Declared value kind.
    #[must_use]
    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    /// Whether absent/null values are accepted on encode.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Secondary index flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Global secondary index: eventually consistent only.
    Global,
    /// Local secondary index: shares the table partition key.
    Local,
}

/// Declaration of a secondary index over logical fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    name: String,
    kind: IndexKind,
    partition_key: String,
    sort_key: Option<String>,
}

impl IndexSchema {
    /// A global secondary index.
    #[must_use]
    pub fn global(name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Global,
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// A local secondary index.
    #[must_use]
    pub fn local(name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Local,
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// Attach a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    /// Index name as known to the store.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Global or local.
    #[must_use]
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Logical name of the index partition key.
    #[must_use]
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// Logical name of the index sort key.
    #[must_use]
    pub fn sort_key(&self) -> Option<&str> {
        self.sort_key.as_deref()
    }

    /// Whether strong reads are structurally possible.
    #[must_use]
    pub fn supports_strong_reads(&self) -> bool {
        self.kind == IndexKind::Local
    }
}

/// Field and index declarations for one table.
#[derive(Debug, Clone)]
pub struct Schema {
    table_name: String,
    fields: Vec<FieldSchema>,
    by_logical: HashMap<String, usize>,
    by_stored: HashMap<String, usize>,
    indexes: Vec<IndexSchema>,
    consistent_read: Option<bool>,
}

impl Schema {
    /// An empty schema for `table_name`.
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            fields: Vec::new(),
            by_logical: HashMap::new(),
            by_stored: HashMap::new(),
            indexes: Vec::new(),
            consistent_read: None,
        }
    }

    /// Chaining form of [`Schema::register`].
    pub fn with_field(mut self, field: FieldSchema) -> Result<Self, SchemaError> {
        self.register(field)?;
        Ok(self)
    }

    /// Chaining form of [`Schema::register_index`].
    pub fn with_index(mut self, index: IndexSchema) -> Result<Self, SchemaError> {
        self.register_index(index)?;
        Ok(self)
    }

    /// Default read consistency for this table, overriding the client config.
    #[must_use]
    pub fn with_consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }

    /// Declare a field.
    pub fn register(&mut self, field: FieldSchema) -> Result<(), SchemaError> {
        if self.by_logical.contains_key(&field.logical_name) {
            return Err(SchemaError::DuplicateLogicalName(field.logical_name));
        }
        if self.by_stored.contains_key(&field.stored_name) {
            return Err(SchemaError::DuplicateStoredName(field.stored_name));
        }
        if field.role != FieldRole::Plain {
            if let Some(existing) = self.field_with_role(field.role) {
                return Err(SchemaError::RoleTaken {
                    role: field.role,
                    existing: existing.logical_name.clone(),
                });
            }
        }

        let idx = self.fields.len();
        self.by_logical.insert(field.logical_name.clone(), idx);
        self.by_stored.insert(field.stored_name.clone(), idx);
        self.fields.push(field);
        Ok(())
    }

    /// Declare a secondary index. Its keys must already be registered.
    pub fn register_index(&mut self, index: IndexSchema) -> Result<(), SchemaError> {
        if self.index(&index.name).is_some() {
            return Err(SchemaError::DuplicateIndex(index.name));
        }
        for key in std::iter::once(index.partition_key.as_str()).chain(index.sort_key()) {
            if !self.by_logical.contains_key(key) {
                return Err(SchemaError::UnknownIndexField {
                    index: index.name.clone(),
                    field: key.to_owned(),
                });
            }
        }
        self.indexes.push(index);
        Ok(())
    }

    /// Table name as declared (without any client prefix).
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Table-level read consistency default, if declared.
    #[must_use]
    pub fn consistent_read(&self) -> Option<bool> {
        self.consistent_read
    }

    /// All declared fields in registration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Look up a field by logical name.
    #[must_use]
    pub fn field(&self, logical_name: &str) -> Option<&FieldSchema> {
        self.by_logical.get(logical_name).map(|&i| &self.fields[i])
    }

    /// Look up a field by stored name.
    #[must_use]
    pub fn field_by_stored(&self, stored_name: &str) -> Option<&FieldSchema> {
        self.by_stored.get(stored_name).map(|&i| &self.fields[i])
    }

    /// The field holding `role`, if any.
    #[must_use]
    pub fn field_with_role(&self, role: FieldRole) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.role == role)
    }

    /// The partition key field.
    #[must_use]
    pub fn partition_key(&self) -> Option<&FieldSchema> {
        self.field_with_role(FieldRole::PartitionKey)
    }

    /// The sort key field.
    #[must_use]
    pub fn sort_key(&self) -> Option<&FieldSchema> {
        self.field_with_role(FieldRole::SortKey)
    }

    /// The discriminator field.
    #[must_use]
    pub fn discriminator(&self) -> Option<&FieldSchema> {
        self.field_with_role(FieldRole::Discriminator)
    }

    /// The version field.
    #[must_use]
    pub fn version_field(&self) -> Option<&FieldSchema> {
        self.field_with_role(FieldRole::Version)
    }

    /// The first field declared as a TTL.
    #[must_use]
    pub fn ttl_field(&self) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|f| f.value_kind == ValueKind::Ttl)
    }

    /// Look up an index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Rewrite the leading segment of a parsed path to its stored name.
    pub fn resolve_path(&self, path: &AttributePath) -> Result<AttributePath, ExpressionError> {
        let field = self
            .field(path.leading())
            .ok_or_else(|| ExpressionError::UnknownAttribute {
                path: path.to_string(),
                segment: path.leading().to_owned(),
            })?;
        Ok(path.with_leading(&field.stored_name))
    }

    /// Rewrite a dotted logical path to its stored form.
    pub fn resolve_to_stored(&self, logical_path: &str) -> Result<String, ExpressionError> {
        let path = AttributePath::parse(logical_path)?;
        Ok(self.resolve_path(&path)?.to_string())
    }

    /// Rewrite a dotted stored path to its logical form. Undeclared names
    /// pass through unchanged.
    #[must_use]
    pub fn resolve_to_logical(&self, stored_path: &str) -> String {
        let Ok(path) = AttributePath::parse(stored_path) else {
            return stored_path.to_owned();
        };
        match self.field_by_stored(path.leading()) {
            Some(field) => path.with_leading(&field.logical_name).to_string(),
            None => stored_path.to_owned(),
        }
    }

    /// Convert a logical record into its stored form.
    ///
    /// Absent fields take their default; a non-nullable field that is still
    /// absent or null fails. Undeclared attributes are written as-is.
    pub fn encode_item(&self, mut item: Item) -> OrmResult<Item> {
        let mut stored = Item::with_capacity(item.len());
        for field in &self.fields {
            match item.remove(&field.logical_name) {
                Some(value) if !value.is_null() => {
                    stored.insert(field.stored_name.clone(), value);
                }
                _ => {
                    if let Some(default) = &field.default_value {
                        stored.insert(field.stored_name.clone(), default.clone());
                    } else if !field.nullable {
                        return Err(OrmError::MissingAttribute(field.logical_name.clone()));
                    }
                }
            }
        }
        stored.extend(item);
        Ok(stored)
    }

    /// Convert a stored record into its logical form.
    #[must_use]
    pub fn decode_item(&self, item: Item) -> Item {
        item.into_iter()
            .map(|(name, value)| match self.field_by_stored(&name) {
                Some(field) => (field.logical_name.clone(), value),
                None => (name, value),
            })
            .collect()
    }

    /// Extract the stored primary key from a logical record.
    pub fn key_of(&self, item: &Item) -> OrmResult<Item> {
        let pk = self
            .partition_key()
            .ok_or_else(|| SchemaError::MissingPartitionKey(self.table_name.clone()))?;

        let mut key = Item::with_capacity(2);
        for field in std::iter::once(pk).chain(self.sort_key()) {
            let value = item
                .get(&field.logical_name)
                .filter(|v| !v.is_null())
                .ok_or_else(|| OrmError::MissingAttribute(field.logical_name.clone()))?;
            key.insert(field.stored_name.clone(), value.clone());
        }
        Ok(key)
    }

    /// Stored names of the attributes that make up a continuation key when
    /// reading the table or `index`: table keys first, then index keys.
    #[must_use]
    pub fn cursor_attributes(&self, index: Option<&IndexSchema>) -> Vec<String> {
        let table_keys = self
            .partition_key()
            .into_iter()
            .chain(self.sort_key())
            .map(|f| f.stored_name.clone());
        let index_keys = index
            .into_iter()
            .flat_map(|i| std::iter::once(i.partition_key()).chain(i.sort_key()))
            .filter_map(|name| self.field(name))
            .map(|f| f.stored_name.clone());

        let mut names: Vec<String> = Vec::new();
        for name in table_keys.chain(index_keys) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}
