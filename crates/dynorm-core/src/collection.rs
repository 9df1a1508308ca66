//! Mixed-type reads routed by discriminator.
//!
//! Several record types can share one table, tagged by a discriminator field.
//! A [`Collection`] maps each discriminator value to a decoder producing the
//! caller's sum type and groups decoded records by value.

use std::collections::BTreeMap;
use std::fmt;

use dynorm_model::{AttributeValue, Item};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{OrmError, OrmResult};
use crate::gateway::{AsyncStorageGateway, StorageGateway};
use crate::query::{AsyncResultIterator, QuerySpec, ResultIterator};
use crate::schema::Schema;

type Decoder<T> = Box<dyn Fn(Item) -> anyhow::Result<T> + Send + Sync>;

/// Discriminator-keyed decoders for one schema.
pub struct Collection<T> {
    discriminator: String,
    decoders: BTreeMap<String, Decoder<T>>,
}

impl<T> Collection<T> {
    /// Create an empty collection. Fails if `schema` declares no
    /// discriminator.
    pub fn new(schema: &Schema) -> OrmResult<Self> {
        let field = schema
            .discriminator()
            .ok_or_else(|| OrmError::MissingDiscriminator(schema.table_name().to_owned()))?;
        Ok(Self {
            discriminator: field.logical_name().to_owned(),
            decoders: BTreeMap::new(),
        })
    }

    /// Route records tagged `value` through `decoder`.
    #[must_use]
    pub fn register<F>(mut self, value: impl Into<String>, decoder: F) -> Self
    where
        F: Fn(Item) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.decoders.insert(value.into(), Box::new(decoder));
        self
    }

    /// Logical name of the discriminator field.
    #[must_use]
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// Decode and group logical-name records.
    ///
    /// Records whose discriminator is missing or unregistered are skipped.
    /// The first read or decode error stops routing.
    pub fn route<I>(&self, records: I) -> OrmResult<CollectionResult<T>>
    where
        I: IntoIterator<Item = OrmResult<Item>>,
    {
        let mut result = CollectionResult::default();
        for record in records {
            let record = record?;
            let Some(tag) = record.get(&self.discriminator).and_then(tag_of) else {
                debug!(discriminator = %self.discriminator, "record without discriminator dropped");
                continue;
            };
            let Some(decoder) = self.decoders.get(&tag) else {
                debug!(discriminator = %self.discriminator, value = %tag, "unregistered discriminator dropped");
                continue;
            };
            let decoded = decoder(record).map_err(OrmError::Decode)?;
            result.buckets.entry(tag).or_default().push(decoded);
        }
        Ok(result)
    }

    /// Drain `spec` through the pagination engine and route every record.
    pub fn query<G: StorageGateway + ?Sized>(
        &self,
        gateway: &G,
        schema: &Schema,
        config: &ClientConfig,
        spec: &QuerySpec,
    ) -> OrmResult<CollectionResult<T>> {
        let read = spec.compile(schema, config)?;
        self.route(ResultIterator::<G, Item>::new(gateway, schema, read))
    }

    /// Async form of [`Collection::query`].
    pub async fn query_async<G: AsyncStorageGateway + ?Sized>(
        &self,
        gateway: &G,
        schema: &Schema,
        config: &ClientConfig,
        spec: &QuerySpec,
    ) -> OrmResult<CollectionResult<T>> {
        let read = spec.compile(schema, config)?;
        let records = AsyncResultIterator::<G, Item>::new(gateway, schema, read)
            .try_collect()
            .await?;
        self.route(records.into_iter().map(Ok))
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("discriminator", &self.discriminator)
            .field("values", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn tag_of(value: &AttributeValue) -> Option<String> {
    match value {
        AttributeValue::S(s) | AttributeValue::N(s) => Some(s.clone()),
        _ => None,
    }
}

/// Decoded records grouped by discriminator value.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionResult<T> {
    buckets: BTreeMap<String, Vec<T>>,
}

impl<T> Default for CollectionResult<T> {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }
}

impl<T> CollectionResult<T> {
    /// Records tagged `value`, in read order.
    #[must_use]
    pub fn get(&self, value: &str) -> &[T] {
        self.buckets.get(value).map(Vec::as_slice).unwrap_or_default()
    }

    /// Total records across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Returns `true` if no record was routed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Consume into the underlying map.
    #[must_use]
    pub fn into_buckets(self) -> BTreeMap<String, Vec<T>> {
        self.buckets
    }
}
