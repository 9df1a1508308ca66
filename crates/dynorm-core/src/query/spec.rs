//! Query and scan specifications.
//!
//! A spec is validated when built and immutable afterwards. Compiling it
//! produces a [`CompiledRead`] whose key condition, filter and projection
//! share one placeholder table.

use dynorm_model::{AttributeValue, Consistency, PageCursor, QueryInput, ScanInput, Select};
use tracing::trace;

use super::paginator::{CompiledRead, ReadRequest};
use crate::config::ClientConfig;
use crate::error::{OrmError, OrmResult};
use crate::expression::{ConditionNode, ExpressionCompiler, PlaceholderTable};
use crate::schema::{IndexSchema, Schema, SchemaError};

/// Read against one partition of the table or an index.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    partition_key_value: AttributeValue,
    sort_key_condition: Option<ConditionNode>,
    filter_condition: Option<ConditionNode>,
    total_limit: Option<usize>,
    page_size: Option<usize>,
    ascending: bool,
    consistency: Option<Consistency>,
    resume_cursor: Option<PageCursor>,
    projection: Option<Vec<String>>,
    index_name: Option<String>,
}

/// Builder for [`QuerySpec`].
#[derive(Debug, Clone)]
pub struct QuerySpecBuilder {
    spec: QuerySpec,
}

impl QuerySpec {
    /// Start a query for the partition holding `partition_key_value`.
    #[must_use]
    pub fn builder(partition_key_value: impl Into<AttributeValue>) -> QuerySpecBuilder {
        QuerySpecBuilder {
            spec: Self {
                partition_key_value: partition_key_value.into(),
                sort_key_condition: None,
                filter_condition: None,
                total_limit: None,
                page_size: None,
                ascending: true,
                consistency: None,
                resume_cursor: None,
                projection: None,
                index_name: None,
            },
        }
    }

    /// Same query, resumed from a persisted cursor.
    #[must_use]
    pub fn resume_from(&self, cursor: PageCursor) -> Self {
        Self {
            resume_cursor: Some(cursor),
            ..self.clone()
        }
    }

    /// Partition key value.
    #[must_use]
    pub fn partition_key_value(&self) -> &AttributeValue {
        &self.partition_key_value
    }

    /// Maximum records yielded overall.
    #[must_use]
    pub fn total_limit(&self) -> Option<usize> {
        self.total_limit
    }

    /// Records requested per round trip.
    #[must_use]
    pub fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    /// Explicit read consistency, if the caller set one.
    #[must_use]
    pub fn consistency(&self) -> Option<Consistency> {
        self.consistency
    }

    /// Target index, if any.
    #[must_use]
    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    /// Compile into a round-trip template.
    pub fn compile(&self, schema: &Schema, config: &ClientConfig) -> OrmResult<CompiledRead> {
        self.compile_read(schema, config, false)
    }

    /// Compile into a count-only template. Projection and total limit do not
    /// apply to counts.
    pub fn compile_count(&self, schema: &Schema, config: &ClientConfig) -> OrmResult<CompiledRead> {
        self.compile_read(schema, config, true)
    }

    fn compile_read(
        &self,
        schema: &Schema,
        config: &ClientConfig,
        count: bool,
    ) -> OrmResult<CompiledRead> {
        let index = lookup_index(schema, self.index_name.as_deref())?;
        let (partition_key, sort_key) = match index {
            Some(index) => (index.partition_key().to_owned(), index.sort_key().map(str::to_owned)),
            None => {
                let pk = schema
                    .partition_key()
                    .ok_or_else(|| SchemaError::MissingPartitionKey(schema.table_name().to_owned()))?;
                (
                    pk.logical_name().to_owned(),
                    schema.sort_key().map(|f| f.logical_name().to_owned()),
                )
            }
        };

        let compiler = ExpressionCompiler::new(schema);
        let mut table = PlaceholderTable::new();
        let key_condition_expression = compiler.compile_key_condition(
            &partition_key,
            &self.partition_key_value,
            sort_key.as_deref(),
            self.sort_key_condition.as_ref(),
            &mut table,
        )?;
        let filter_expression = self
            .filter_condition
            .as_ref()
            .map(|f| compiler.compile_condition(f, &mut table))
            .transpose()?;
        let projection_expression = if count {
            None
        } else {
            compile_projection(&compiler, self.projection.as_deref(), index, &mut table)?
        };
        trace!(
            key_condition = %key_condition_expression,
            filter = ?filter_expression,
            "compiled query"
        );

        let (expression_attribute_names, expression_attribute_values) = table.into_maps();
        let input = QueryInput {
            table_name: config.table_name(schema.table_name()),
            index_name: self.index_name.clone(),
            key_condition_expression,
            filter_expression,
            projection_expression,
            expression_attribute_names,
            expression_attribute_values,
            scan_index_forward: self.ascending,
            limit: round_trip_limit(self.page_size, self.total_limit, config, count),
            exclusive_start_key: self.resume_cursor.clone(),
            select: count.then_some(Select::Count),
            consistent_read: resolve_consistency(self.consistency, index, schema, config)
                .is_strong(),
        };

        Ok(CompiledRead {
            request: ReadRequest::Query(input),
            total_limit: if count { None } else { self.total_limit },
            cursor_attributes: schema.cursor_attributes(index),
        })
    }
}

impl QuerySpecBuilder {
    /// Condition on the sort key of the target.
    #[must_use]
    pub fn sort_key(mut self, condition: ConditionNode) -> Self {
        self.spec.sort_key_condition = Some(condition);
        self
    }

    /// Condition applied after the key match.
    #[must_use]
    pub fn filter(mut self, condition: ConditionNode) -> Self {
        self.spec.filter_condition = Some(condition);
        self
    }

    /// Maximum records yielded overall.
    #[must_use]
    pub fn limit(mut self, total_limit: usize) -> Self {
        self.spec.total_limit = Some(total_limit);
        self
    }

    /// Records requested per round trip.
    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.spec.page_size = Some(page_size);
        self
    }

    /// Sort key order (default ascending).
    #[must_use]
    pub fn ascending(mut self, ascending: bool) -> Self {
        self.spec.ascending = ascending;
        self
    }

    /// Explicit read consistency.
    #[must_use]
    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.spec.consistency = Some(consistency);
        self
    }

    /// Shorthand for [`QuerySpecBuilder::consistency`].
    #[must_use]
    pub fn consistent_read(self, consistent_read: bool) -> Self {
        self.consistency(Consistency::from(consistent_read))
    }

    /// Start after a cursor from an earlier read.
    #[must_use]
    pub fn resume_from(mut self, cursor: PageCursor) -> Self {
        self.spec.resume_cursor = Some(cursor);
        self
    }

    /// Attributes to retrieve (logical paths).
    #[must_use]
    pub fn projection<S: Into<String>>(mut self, paths: impl IntoIterator<Item = S>) -> Self {
        self.spec.projection = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Query an index instead of the table.
    #[must_use]
    pub fn index(mut self, index_name: impl Into<String>) -> Self {
        self.spec.index_name = Some(index_name.into());
        self
    }

    /// Validate against `schema` and freeze the spec.
    pub fn build(self, schema: &Schema) -> OrmResult<QuerySpec> {
        validate(
            schema,
            self.spec.index_name.as_deref(),
            self.spec.consistency,
            self.spec.page_size,
        )?;
        Ok(self.spec)
    }
}

/// Read over a whole table or index, optionally one segment of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSpec {
    filter_condition: Option<ConditionNode>,
    total_limit: Option<usize>,
    page_size: Option<usize>,
    consistency: Option<Consistency>,
    resume_cursor: Option<PageCursor>,
    projection: Option<Vec<String>>,
    segment: Option<u32>,
    total_segments: Option<u32>,
    index_name: Option<String>,
}

/// Builder for [`ScanSpec`].
#[derive(Debug, Clone)]
pub struct ScanSpecBuilder {
    spec: ScanSpec,
}

impl ScanSpec {
    /// Start a scan.
    #[must_use]
    pub fn builder() -> ScanSpecBuilder {
        ScanSpecBuilder {
            spec: Self {
                filter_condition: None,
                total_limit: None,
                page_size: None,
                consistency: None,
                resume_cursor: None,
                projection: None,
                segment: None,
                total_segments: None,
                index_name: None,
            },
        }
    }

    /// Same scan, resumed from a persisted cursor.
    #[must_use]
    pub fn resume_from(&self, cursor: PageCursor) -> Self {
        Self {
            resume_cursor: Some(cursor),
            ..self.clone()
        }
    }

    /// Split into `total` independent segment specs, in segment order.
    ///
    /// Each segment applies the total limit on its own and starts from the
    /// beginning of its segment.
    pub fn segments(&self, total: u32) -> OrmResult<Vec<ScanSpec>> {
        if total == 0 {
            return Err(OrmError::InvalidSegment {
                segment: 0,
                total_segments: 0,
            });
        }
        Ok((0..total)
            .map(|segment| Self {
                segment: Some(segment),
                total_segments: Some(total),
                resume_cursor: None,
                ..self.clone()
            })
            .collect())
    }

    /// Segment this spec reads, with the segment count.
    #[must_use]
    pub fn segment(&self) -> Option<(u32, u32)> {
        self.segment.zip(self.total_segments)
    }

    /// Maximum records yielded overall.
    #[must_use]
    pub fn total_limit(&self) -> Option<usize> {
        self.total_limit
    }

    /// Explicit read consistency, if the caller set one.
    #[must_use]
    pub fn consistency(&self) -> Option<Consistency> {
        self.consistency
    }

    /// Compile into a round-trip template.
    pub fn compile(&self, schema: &Schema, config: &ClientConfig) -> OrmResult<CompiledRead> {
        self.compile_read(schema, config, false)
    }

    /// Compile into a count-only template.
    pub fn compile_count(&self, schema: &Schema, config: &ClientConfig) -> OrmResult<CompiledRead> {
        self.compile_read(schema, config, true)
    }

    fn compile_read(
        &self,
        schema: &Schema,
        config: &ClientConfig,
        count: bool,
    ) -> OrmResult<CompiledRead> {
        let index = lookup_index(schema, self.index_name.as_deref())?;
        let compiler = ExpressionCompiler::new(schema);
        let mut table = PlaceholderTable::new();
        let filter_expression = self
            .filter_condition
            .as_ref()
            .map(|f| compiler.compile_condition(f, &mut table))
            .transpose()?;
        let projection_expression = if count {
            None
        } else {
            compile_projection(&compiler, self.projection.as_deref(), index, &mut table)?
        };
        trace!(filter = ?filter_expression, "compiled scan");

        let (expression_attribute_names, expression_attribute_values) = table.into_maps();
        let input = ScanInput {
            table_name: config.table_name(schema.table_name()),
            index_name: self.index_name.clone(),
            filter_expression,
            projection_expression,
            expression_attribute_names,
            expression_attribute_values,
            limit: round_trip_limit(self.page_size, self.total_limit, config, count),
            exclusive_start_key: self.resume_cursor.clone(),
            segment: self.segment,
            total_segments: self.total_segments,
            select: count.then_some(Select::Count),
            consistent_read: resolve_consistency(self.consistency, index, schema, config)
                .is_strong(),
        };

        Ok(CompiledRead {
            request: ReadRequest::Scan(input),
            total_limit: if count { None } else { self.total_limit },
            cursor_attributes: schema.cursor_attributes(index),
        })
    }
}

impl ScanSpecBuilder {
    /// Condition applied to every scanned record.
    #[must_use]
    pub fn filter(mut self, condition: ConditionNode) -> Self {
        self.spec.filter_condition = Some(condition);
        self
    }

    /// Maximum records yielded overall.
    #[must_use]
    pub fn limit(mut self, total_limit: usize) -> Self {
        self.spec.total_limit = Some(total_limit);
        self
    }

    /// Records requested per round trip.
    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.spec.page_size = Some(page_size);
        self
    }

    /// Explicit read consistency.
    #[must_use]
    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.spec.consistency = Some(consistency);
        self
    }

    /// Shorthand for [`ScanSpecBuilder::consistency`].
    #[must_use]
    pub fn consistent_read(self, consistent_read: bool) -> Self {
        self.consistency(Consistency::from(consistent_read))
    }

    /// Start after a cursor from an earlier read.
    #[must_use]
    pub fn resume_from(mut self, cursor: PageCursor) -> Self {
        self.spec.resume_cursor = Some(cursor);
        self
    }

    /// Attributes to retrieve (logical paths).
    #[must_use]
    pub fn projection<S: Into<String>>(mut self, paths: impl IntoIterator<Item = S>) -> Self {
        self.spec.projection = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Scan an index instead of the table.
    #[must_use]
    pub fn index(mut self, index_name: impl Into<String>) -> Self {
        self.spec.index_name = Some(index_name.into());
        self
    }

    /// Read only `segment` of `total_segments`.
    #[must_use]
    pub fn segment(mut self, segment: u32, total_segments: u32) -> Self {
        self.spec.segment = Some(segment);
        self.spec.total_segments = Some(total_segments);
        self
    }

    /// Validate against `schema` and freeze the spec.
    pub fn build(self, schema: &Schema) -> OrmResult<ScanSpec> {
        validate(
            schema,
            self.spec.index_name.as_deref(),
            self.spec.consistency,
            self.spec.page_size,
        )?;
        if let Some((segment, total_segments)) = self.spec.segment() {
            if segment >= total_segments {
                return Err(OrmError::InvalidSegment {
                    segment,
                    total_segments,
                });
            }
        }
        Ok(self.spec)
    }
}

fn lookup_index<'s>(schema: &'s Schema, name: Option<&str>) -> OrmResult<Option<&'s IndexSchema>> {
    name.map(|name| {
        schema
            .index(name)
            .ok_or_else(|| OrmError::UnknownIndex(name.to_owned()))
    })
    .transpose()
}

fn validate(
    schema: &Schema,
    index_name: Option<&str>,
    consistency: Option<Consistency>,
    page_size: Option<usize>,
) -> OrmResult<()> {
    if page_size == Some(0) {
        return Err(OrmError::InvalidPageSize);
    }
    let index = lookup_index(schema, index_name)?;
    if let Some(index) = index {
        if consistency.is_some_and(Consistency::is_strong) && !index.supports_strong_reads() {
            return Err(OrmError::IncompatibleConsistency {
                index: index.name().to_owned(),
            });
        }
    }
    Ok(())
}

/// Explicit choice wins; otherwise a global index reads eventually and
/// everything else inherits the schema, then client, default.
pub(crate) fn resolve_consistency(
    explicit: Option<Consistency>,
    index: Option<&IndexSchema>,
    schema: &Schema,
    config: &ClientConfig,
) -> Consistency {
    if let Some(consistency) = explicit {
        return consistency;
    }
    if index.is_some_and(|i| !i.supports_strong_reads()) {
        return Consistency::Eventual;
    }
    Consistency::from(schema.consistent_read().unwrap_or(config.consistent_read))
}

fn round_trip_limit(
    page_size: Option<usize>,
    total_limit: Option<usize>,
    config: &ClientConfig,
    count: bool,
) -> Option<u32> {
    let per_page = page_size.or(config.default_page_size);
    let limit = if count { per_page } else { per_page.or(total_limit) };
    limit.map(|n| u32::try_from(n).unwrap_or(u32::MAX))
}

/// Projections always carry the key attributes of the target so a cursor can
/// be rebuilt from any yielded record.
pub(crate) fn compile_projection(
    compiler: &ExpressionCompiler<'_>,
    projection: Option<&[String]>,
    index: Option<&IndexSchema>,
    table: &mut PlaceholderTable,
) -> OrmResult<Option<String>> {
    let Some(paths) = projection else {
        return Ok(None);
    };
    let schema = compiler.schema();
    let mut all: Vec<&str> = paths.iter().map(String::as_str).collect();
    let keys = schema
        .partition_key()
        .into_iter()
        .chain(schema.sort_key())
        .map(|f| f.logical_name())
        .chain(index.into_iter().flat_map(|i| std::iter::once(i.partition_key()).chain(i.sort_key())));
    all.extend(keys);
    Ok(Some(compiler.compile_projection(&all, table)?))
}
