//! Wire-facing model types for dynorm.
//!
//! This crate holds everything that crosses the storage gateway boundary:
//! attribute values, compiled request artifacts, page responses, the opaque
//! cursor, and the store's error taxonomy. It carries no compilation logic.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod output;
pub mod types;

pub use attribute_value::{AttributeValue, Item};
pub use error::{StoreError, StoreErrorCode};
pub use input::{
    DeleteItemInput, GetItemInput, PutItemInput, QueryInput, ScanInput, UpdateItemInput,
    WriteRequest,
};
pub use output::{GetItemOutput, ReadPage, WriteOutput};
pub use types::{Consistency, PageCursor, ReturnValue, Select};
