//! Table facade tying schema, config and gateway together.
//!
//! Every operation compiles its artifacts first and only then talks to the
//! gateway, so compile errors never cost a round trip. Write preparation is
//! shared by the blocking and async entry points.

use std::fmt;

use dynorm_model::{
    AttributeValue, Consistency, DeleteItemInput, GetItemInput, Item, PutItemInput,
    UpdateItemInput, WriteOutput, WriteRequest,
};
use tracing::debug;

use crate::collection::{Collection, CollectionResult};
use crate::config::ClientConfig;
use crate::decode::{Decode, Encode, decode_record};
use crate::error::{OrmError, OrmResult};
use crate::expression::{
    ConditionNode, ExpressionCompiler, PlaceholderTable, UpdateOperation, field,
};
use crate::gateway::{AsyncStorageGateway, StorageGateway};
use crate::locking::{build_version_guard, guard_with};
use crate::query::spec::{compile_projection, resolve_consistency};
use crate::query::{AsyncResultIterator, QuerySpec, ResultIterator, ScanSpec, iter, stream};
use crate::schema::Schema;

/// One table, reachable through gateway `G`.
pub struct Table<G> {
    gateway: G,
    schema: Schema,
    config: ClientConfig,
}

impl<G> Table<G> {
    /// Bind `schema` to `gateway` with default client config.
    #[must_use]
    pub fn new(gateway: G, schema: Schema) -> Self {
        Self::with_config(gateway, schema, ClientConfig::default())
    }

    /// Bind `schema` to `gateway` with explicit client config.
    #[must_use]
    pub fn with_config(gateway: G, schema: Schema, config: ClientConfig) -> Self {
        Self {
            gateway,
            schema,
            config,
        }
    }

    /// The table schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The client config.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn table_name(&self) -> String {
        self.config.table_name(self.schema.table_name())
    }

    /// Compile a read of the record addressed by the keys in `key`.
    ///
    /// Consistency resolves like a base-table query: explicit, then schema,
    /// then client config. A projection always carries the key attributes.
    pub fn prepare_get(
        &self,
        key: &Item,
        consistency: Option<Consistency>,
        projection: Option<&[String]>,
    ) -> OrmResult<GetItemInput> {
        let key = self.schema.key_of(key)?;
        let compiler = ExpressionCompiler::new(&self.schema);
        let mut table = PlaceholderTable::new();
        let projection_expression = compile_projection(&compiler, projection, None, &mut table)?;
        let (expression_attribute_names, _) = table.into_maps();
        Ok(GetItemInput {
            table_name: self.table_name(),
            key,
            projection_expression,
            expression_attribute_names,
            consistent_read: resolve_consistency(consistency, None, &self.schema, &self.config)
                .is_strong(),
        })
    }

    /// Compile a put of a logical record.
    pub fn prepare_put(&self, item: Item, condition: Option<ConditionNode>) -> OrmResult<WriteRequest> {
        let item = self.schema.encode_item(item)?;
        let mut table = PlaceholderTable::new();
        let condition_expression = condition
            .map(|c| ExpressionCompiler::new(&self.schema).compile_condition(&c, &mut table))
            .transpose()?;
        let (expression_attribute_names, expression_attribute_values) = table.into_maps();
        Ok(WriteRequest::Put(PutItemInput {
            table_name: self.table_name(),
            item,
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            return_values: None,
        }))
    }

    /// Compile an update of the record addressed by the keys in `key`.
    pub fn prepare_update(
        &self,
        key: &Item,
        ops: &[UpdateOperation],
        condition: Option<ConditionNode>,
    ) -> OrmResult<WriteRequest> {
        let key = self.schema.key_of(key)?;
        let compiled = ExpressionCompiler::new(&self.schema).compile_update(ops, condition.as_ref())?;
        let (expression_attribute_names, expression_attribute_values) =
            compiled.placeholders.into_maps();
        Ok(WriteRequest::Update(UpdateItemInput {
            table_name: self.table_name(),
            key,
            update_expression: compiled.update_expression,
            condition_expression: compiled.condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            return_values: None,
        }))
    }

    /// Compile a delete of the record addressed by the keys in `key`.
    pub fn prepare_delete(&self, key: &Item, condition: Option<ConditionNode>) -> OrmResult<WriteRequest> {
        let key = self.schema.key_of(key)?;
        let mut table = PlaceholderTable::new();
        let condition_expression = condition
            .map(|c| ExpressionCompiler::new(&self.schema).compile_condition(&c, &mut table))
            .transpose()?;
        let (expression_attribute_names, expression_attribute_values) = table.into_maps();
        Ok(WriteRequest::Delete(DeleteItemInput {
            table_name: self.table_name(),
            key,
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            return_values: None,
        }))
    }

    /// Compile a guarded put that bumps the version. Returns the request and
    /// the version it writes.
    pub fn prepare_put_versioned(
        &self,
        mut item: Item,
        condition: Option<ConditionNode>,
    ) -> OrmResult<(WriteRequest, i64)> {
        let (version, guard, next) = self.version_guard(&item)?;
        item.insert(version, AttributeValue::from(next));
        let request = self.prepare_put(item, Some(guard_with(condition, guard)))?;
        Ok((request, next))
    }

    /// Compile a guarded update that bumps the version. `item` must carry
    /// the record key and the version last read.
    pub fn prepare_update_versioned(
        &self,
        item: &Item,
        mut ops: Vec<UpdateOperation>,
        condition: Option<ConditionNode>,
    ) -> OrmResult<(WriteRequest, i64)> {
        let (version, guard, next) = self.version_guard(item)?;
        ops.push(field(version).set(next));
        let request = self.prepare_update(item, &ops, Some(guard_with(condition, guard)))?;
        Ok((request, next))
    }

    fn version_guard(&self, item: &Item) -> OrmResult<(String, ConditionNode, i64)> {
        let version = self
            .schema
            .version_field()
            .ok_or_else(|| OrmError::NoVersionField(self.schema.table_name().to_owned()))?
            .logical_name()
            .to_owned();
        let current = match item.get(&version).filter(|v| !v.is_null()) {
            None => None,
            Some(value) => Some(value.as_i64().ok_or_else(|| {
                OrmError::Decode(anyhow::anyhow!(
                    "version attribute '{version}' is not an integer: {value}"
                ))
            })?),
        };
        let (guard, next) = build_version_guard(&self.schema, current)?;
        Ok((version, guard, next))
    }
}

/// Plain field assignments as `Set` operations, in field name order.
#[must_use]
pub fn assignments(values: Item) -> Vec<UpdateOperation> {
    let mut values: Vec<(String, AttributeValue)> = values.into_iter().collect();
    values.sort_by(|a, b| a.0.cmp(&b.0));
    values
        .into_iter()
        .map(|(name, value)| field(name).set(value))
        .collect()
}

impl<G: StorageGateway> Table<G> {
    /// Lazily read one partition.
    pub fn query<T: Decode>(&self, spec: &QuerySpec) -> OrmResult<ResultIterator<'_, G, T>> {
        let read = spec.compile(&self.schema, &self.config)?;
        Ok(ResultIterator::new(&self.gateway, &self.schema, read))
    }

    /// Lazily read the whole table, index or segment.
    pub fn scan<T: Decode>(&self, spec: &ScanSpec) -> OrmResult<ResultIterator<'_, G, T>> {
        let read = spec.compile(&self.schema, &self.config)?;
        Ok(ResultIterator::new(&self.gateway, &self.schema, read))
    }

    /// Count records matching a query without decoding them.
    pub fn count_query(&self, spec: &QuerySpec) -> OrmResult<u64> {
        iter::count(&self.gateway, spec.compile_count(&self.schema, &self.config)?)
    }

    /// Count records matching a scan without decoding them.
    pub fn count_scan(&self, spec: &ScanSpec) -> OrmResult<u64> {
        iter::count(&self.gateway, spec.compile_count(&self.schema, &self.config)?)
    }

    /// Query a mixed-type partition and route records by discriminator.
    pub fn query_collection<T>(
        &self,
        collection: &Collection<T>,
        spec: &QuerySpec,
    ) -> OrmResult<CollectionResult<T>> {
        collection.query(&self.gateway, &self.schema, &self.config, spec)
    }

    /// Fetch one record by key, `None` when no record has it.
    pub fn get<T: Decode>(
        &self,
        key: &Item,
        consistency: Option<Consistency>,
        projection: Option<&[String]>,
    ) -> OrmResult<Option<T>> {
        let input = self.prepare_get(key, consistency, projection)?;
        debug!(table = %input.table_name, consistent = input.consistent_read, "issuing get");
        let output = self.gateway.issue_get(&input)?;
        output
            .item
            .map(|raw| decode_record(&self.schema, raw))
            .transpose()
    }

    /// Write a logical record.
    pub fn put(&self, item: Item, condition: Option<ConditionNode>) -> OrmResult<WriteOutput> {
        self.write(&self.prepare_put(item, condition)?)
    }

    /// Write a typed record through its [`Encode`] form.
    pub fn put_record<R: Encode>(&self, record: &R, condition: Option<ConditionNode>) -> OrmResult<WriteOutput> {
        self.put(record.encode(), condition)
    }

    /// Apply update operations to one record.
    pub fn update(
        &self,
        key: &Item,
        ops: &[UpdateOperation],
        condition: Option<ConditionNode>,
    ) -> OrmResult<WriteOutput> {
        self.write(&self.prepare_update(key, ops, condition)?)
    }

    /// Assign plain field values on one record.
    pub fn assign(&self, key: &Item, values: Item, condition: Option<ConditionNode>) -> OrmResult<WriteOutput> {
        self.update(key, &assignments(values), condition)
    }

    /// Delete one record.
    pub fn delete(&self, key: &Item, condition: Option<ConditionNode>) -> OrmResult<WriteOutput> {
        self.write(&self.prepare_delete(key, condition)?)
    }

    /// Put guarded by the record's version. Returns the version written.
    pub fn put_versioned(&self, item: Item, condition: Option<ConditionNode>) -> OrmResult<i64> {
        let (request, next) = self.prepare_put_versioned(item, condition)?;
        self.write(&request)?;
        Ok(next)
    }

    /// Update guarded by the record's version. Returns the version written.
    pub fn update_versioned(
        &self,
        item: &Item,
        ops: Vec<UpdateOperation>,
        condition: Option<ConditionNode>,
    ) -> OrmResult<i64> {
        let (request, next) = self.prepare_update_versioned(item, ops, condition)?;
        self.write(&request)?;
        Ok(next)
    }

    fn write(&self, request: &WriteRequest) -> OrmResult<WriteOutput> {
        debug!(
            table = %request.table_name(),
            conditional = request.condition_expression().is_some(),
            "issuing write"
        );
        Ok(self.gateway.issue_write(request)?)
    }
}

impl<G: AsyncStorageGateway> Table<G> {
    /// Lazily read one partition.
    pub fn query_async<T: Decode>(&self, spec: &QuerySpec) -> OrmResult<AsyncResultIterator<'_, G, T>> {
        let read = spec.compile(&self.schema, &self.config)?;
        Ok(AsyncResultIterator::new(&self.gateway, &self.schema, read))
    }

    /// Lazily read the whole table, index or segment.
    pub fn scan_async<T: Decode>(&self, spec: &ScanSpec) -> OrmResult<AsyncResultIterator<'_, G, T>> {
        let read = spec.compile(&self.schema, &self.config)?;
        Ok(AsyncResultIterator::new(&self.gateway, &self.schema, read))
    }

    /// Scan all `total_segments` segments concurrently. Results are returned
    /// per segment, in segment order.
    pub async fn parallel_scan<T: Decode>(
        &self,
        spec: &ScanSpec,
        total_segments: u32,
    ) -> OrmResult<Vec<Vec<T>>> {
        let reads = spec
            .segments(total_segments)?
            .iter()
            .map(|segment| segment.compile(&self.schema, &self.config))
            .collect::<OrmResult<Vec<_>>>()?;
        let segments = reads.into_iter().map(|read| {
            AsyncResultIterator::<G, T>::new(&self.gateway, &self.schema, read).try_collect()
        });
        futures::future::try_join_all(segments).await
    }

    /// Count records matching a query without decoding them.
    pub async fn count_query_async(&self, spec: &QuerySpec) -> OrmResult<u64> {
        stream::count(&self.gateway, spec.compile_count(&self.schema, &self.config)?).await
    }

    /// Count records matching a scan without decoding them.
    pub async fn count_scan_async(&self, spec: &ScanSpec) -> OrmResult<u64> {
        stream::count(&self.gateway, spec.compile_count(&self.schema, &self.config)?).await
    }

    /// Query a mixed-type partition and route records by discriminator.
    pub async fn query_collection_async<T>(
        &self,
        collection: &Collection<T>,
        spec: &QuerySpec,
    ) -> OrmResult<CollectionResult<T>> {
        collection
            .query_async(&self.gateway, &self.schema, &self.config, spec)
            .await
    }

    /// Fetch one record by key, `None` when no record has it.
    pub async fn get_async<T: Decode>(
        &self,
        key: &Item,
        consistency: Option<Consistency>,
        projection: Option<&[String]>,
    ) -> OrmResult<Option<T>> {
        let input = self.prepare_get(key, consistency, projection)?;
        debug!(table = %input.table_name, consistent = input.consistent_read, "issuing get");
        let output = self.gateway.issue_get(&input).await?;
        output
            .item
            .map(|raw| decode_record(&self.schema, raw))
            .transpose()
    }

    /// Write a logical record.
    pub async fn put_async(&self, item: Item, condition: Option<ConditionNode>) -> OrmResult<WriteOutput> {
        let request = self.prepare_put(item, condition)?;
        self.write_async(&request).await
    }

    /// Write a typed record through its [`Encode`] form.
    pub async fn put_record_async<R: Encode + Sync>(
        &self,
        record: &R,
        condition: Option<ConditionNode>,
    ) -> OrmResult<WriteOutput> {
        self.put_async(record.encode(), condition).await
    }

    /// Apply update operations to one record.
    pub async fn update_async(
        &self,
        key: &Item,
        ops: &[UpdateOperation],
        condition: Option<ConditionNode>,
    ) -> OrmResult<WriteOutput> {
        let request = self.prepare_update(key, ops, condition)?;
        self.write_async(&request).await
    }

    /// Delete one record.
    pub async fn delete_async(&self, key: &Item, condition: Option<ConditionNode>) -> OrmResult<WriteOutput> {
        let request = self.prepare_delete(key, condition)?;
        self.write_async(&request).await
    }

    /// Put guarded by the record's version. Returns the version written.
    pub async fn put_versioned_async(&self, item: Item, condition: Option<ConditionNode>) -> OrmResult<i64> {
        let (request, next) = self.prepare_put_versioned(item, condition)?;
        self.write_async(&request).await?;
        Ok(next)
    }

    /// Update guarded by the record's version. Returns the version written.
    pub async fn update_versioned_async(
        &self,
        item: &Item,
        ops: Vec<UpdateOperation>,
        condition: Option<ConditionNode>,
    ) -> OrmResult<i64> {
        let (request, next) = self.prepare_update_versioned(item, ops, condition)?;
        self.write_async(&request).await?;
        Ok(next)
    }

    async fn write_async(&self, request: &WriteRequest) -> OrmResult<WriteOutput> {
        debug!(
            table = %request.table_name(),
            conditional = request.condition_expression().is_some(),
            "issuing write"
        );
        Ok(self.gateway.issue_write(request).await?)
    }
}

impl<G> fmt::Debug for Table<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("table_name", &self.schema.table_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
