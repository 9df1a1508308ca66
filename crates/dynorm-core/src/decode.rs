//! Record decoding.
//!
//! Raw records arrive keyed by stored names. They are renamed to logical
//! names through the schema before a [`Decode`] implementation sees them.

use dynorm_model::Item;

use crate::error::{OrmError, OrmResult};
use crate::schema::Schema;

/// Build a value from a logical-name record.
pub trait Decode: Sized {
    /// Decode one record.
    fn decode(item: Item) -> anyhow::Result<Self>;
}

impl Decode for Item {
    fn decode(item: Item) -> anyhow::Result<Self> {
        Ok(item)
    }
}

/// Serialize a value into a logical-name record.
pub trait Encode {
    /// Encode one record.
    fn encode(&self) -> Item;
}

impl Encode for Item {
    fn encode(&self) -> Item {
        self.clone()
    }
}

/// Rename a stored record to logical names and decode it.
pub fn decode_record<T: Decode>(schema: &Schema, raw: Item) -> OrmResult<T> {
    T::decode(schema.decode_item(raw)).map_err(OrmError::Decode)
}
