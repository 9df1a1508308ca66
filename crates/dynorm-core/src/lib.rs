//! Expression compiler and paginated query engine for DynamoDB-style stores.
//!
//! Callers declare a [`Schema`] per model, build condition and update trees
//! over logical field names, and describe reads with [`QuerySpec`] or
//! [`ScanSpec`]. The core compiles these into placeholder-only expression
//! text and drives pagination through a caller-supplied storage gateway,
//! either blocking ([`StorageGateway`]) or async ([`AsyncStorageGateway`]).
//!
//! ```
//! use dynorm_core::expression::{ExpressionCompiler, PlaceholderTable, field};
//! use dynorm_core::schema::{FieldSchema, Schema};
//!
//! let schema = Schema::new("users")
//!     .with_field(FieldSchema::string("user_id").partition_key())?
//!     .with_field(FieldSchema::string("status").alias("st"))?;
//!
//! let mut table = PlaceholderTable::new();
//! let text = ExpressionCompiler::new(&schema)
//!     .compile_condition(&field("status").eq("active"), &mut table)?;
//! assert_eq!(text, "#n0 = :v0");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod collection;
pub mod config;
pub mod decode;
pub mod error;
pub mod expression;
pub mod gateway;
pub mod locking;
pub mod query;
pub mod schema;
pub mod table;
pub mod ttl;

pub use collection::{Collection, CollectionResult};
pub use config::ClientConfig;
pub use decode::{Decode, Encode};
pub use error::{OrmError, OrmResult};
pub use expression::{ConditionNode, ExpressionError, UpdateOperation, field};
pub use gateway::{AsyncStorageGateway, StorageGateway};
pub use locking::build_version_guard;
pub use query::{AsyncResultIterator, QuerySpec, ResultIterator, ScanSpec};
pub use schema::{FieldRole, FieldSchema, IndexKind, IndexSchema, Schema, SchemaError, ValueKind};
pub use table::Table;
