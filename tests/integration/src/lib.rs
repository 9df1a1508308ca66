//! Integration tests for dynorm.
//!
//! Every scenario drives the public API end to end against [`ScriptedStore`],
//! an in-test gateway that serves one sorted partition and records every
//! artifact it receives. Run them with:
//! ```text
//! cargo test -p dynorm-integration
//! ```

use std::sync::{Mutex, Once};

use dynorm_core::query::ReadRequest;
use dynorm_core::{AsyncStorageGateway, FieldSchema, IndexSchema, Schema, StorageGateway, ValueKind};
use dynorm_model::{
    AttributeValue, GetItemInput, GetItemOutput, Item, PageCursor, QueryInput, ReadPage,
    ScanInput, Select, StoreError, WriteOutput, WriteRequest,
};

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Gateway double serving records in sort key order.
///
/// It honours `Limit`, `ExclusiveStartKey`, `ScanIndexForward`, `Select` and
/// scan segments, but does not evaluate key conditions or filters: tests put
/// exactly the records a read should see. Continuation keys hold only the
/// table key attributes, like the real store's.
#[derive(Debug)]
pub struct ScriptedStore {
    partition_key: String,
    sort_key: String,
    records: Vec<Item>,
    reads: Mutex<Vec<ReadRequest>>,
    gets: Mutex<Vec<GetItemInput>>,
    writes: Mutex<Vec<WriteRequest>>,
    write_error: Mutex<Option<StoreError>>,
}

impl ScriptedStore {
    /// A store keyed by the stored names `partition_key`/`sort_key`.
    #[must_use]
    pub fn new(partition_key: &str, sort_key: &str, mut records: Vec<Item>) -> Self {
        records.sort_by(|a, b| sort_value(a, sort_key).cmp(&sort_value(b, sort_key)));
        Self {
            partition_key: partition_key.to_owned(),
            sort_key: sort_key.to_owned(),
            records,
            reads: Mutex::new(Vec::new()),
            gets: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            write_error: Mutex::new(None),
        }
    }

    /// Every read request received, in order.
    #[must_use]
    pub fn reads(&self) -> Vec<ReadRequest> {
        self.reads.lock().unwrap().clone()
    }

    /// Every single-record read received, in order.
    #[must_use]
    pub fn gets(&self) -> Vec<GetItemInput> {
        self.gets.lock().unwrap().clone()
    }

    /// Every write request received, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<WriteRequest> {
        self.writes.lock().unwrap().clone()
    }

    /// Fail the next write with `err`.
    pub fn fail_next_write(&self, err: StoreError) {
        *self.write_error.lock().unwrap() = Some(err);
    }

    fn page(
        &self,
        start: Option<&PageCursor>,
        limit: Option<u32>,
        forward: bool,
        segment: Option<(u32, u32)>,
        select: Option<&Select>,
    ) -> ReadPage {
        let mut ordered: Vec<&Item> = self
            .records
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                segment.is_none_or(|(segment, total)| *i as u32 % total == segment)
            })
            .map(|(_, r)| r)
            .collect();
        if !forward {
            ordered.reverse();
        }

        let from = start
            .and_then(|cursor| cursor.as_item().get(&self.sort_key))
            .and_then(|sk| ordered.iter().position(|r| r.get(&self.sort_key) == Some(sk)))
            .map_or(0, |p| p + 1);
        let to = limit.map_or(ordered.len(), |l| (from + l as usize).min(ordered.len()));
        let items: Vec<Item> = ordered[from..to].iter().map(|r| (*r).clone()).collect();
        let cursor = (to < ordered.len()).then(|| PageCursor::new(self.key_of(ordered[to - 1])));

        if select == Some(&Select::Count) {
            let mut page = ReadPage::new(Vec::new(), cursor);
            page.count = u32::try_from(items.len()).unwrap();
            page.scanned_count = page.count;
            return page;
        }
        ReadPage::new(items, cursor)
    }

    fn key_of(&self, record: &Item) -> Item {
        [&self.partition_key, &self.sort_key]
            .into_iter()
            .filter_map(|name| record.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }

    fn query(&self, input: &QueryInput) -> ReadPage {
        self.reads
            .lock()
            .unwrap()
            .push(ReadRequest::Query(input.clone()));
        self.page(
            input.exclusive_start_key.as_ref(),
            input.limit,
            input.scan_index_forward,
            None,
            input.select.as_ref(),
        )
    }

    fn scan(&self, input: &ScanInput) -> ReadPage {
        self.reads
            .lock()
            .unwrap()
            .push(ReadRequest::Scan(input.clone()));
        self.page(
            input.exclusive_start_key.as_ref(),
            input.limit,
            true,
            input.segment.zip(input.total_segments),
            input.select.as_ref(),
        )
    }

    fn get(&self, input: &GetItemInput) -> GetItemOutput {
        self.gets.lock().unwrap().push(input.clone());
        let item = self
            .records
            .iter()
            .find(|r| self.key_of(r) == input.key)
            .cloned();
        GetItemOutput { item }
    }

    fn write(&self, request: &WriteRequest) -> Result<WriteOutput, StoreError> {
        if let Some(err) = self.write_error.lock().unwrap().take() {
            return Err(err);
        }
        self.writes.lock().unwrap().push(request.clone());
        Ok(WriteOutput::default())
    }
}

fn sort_value(record: &Item, sort_key: &str) -> String {
    record
        .get(sort_key)
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl StorageGateway for ScriptedStore {
    fn issue_query(&self, input: &QueryInput) -> Result<ReadPage, StoreError> {
        Ok(self.query(input))
    }

    fn issue_scan(&self, input: &ScanInput) -> Result<ReadPage, StoreError> {
        Ok(self.scan(input))
    }

    fn issue_get(&self, input: &GetItemInput) -> Result<GetItemOutput, StoreError> {
        Ok(self.get(input))
    }

    fn issue_write(&self, request: &WriteRequest) -> Result<WriteOutput, StoreError> {
        self.write(request)
    }
}

#[async_trait::async_trait]
impl AsyncStorageGateway for ScriptedStore {
    async fn issue_query(&self, input: &QueryInput) -> Result<ReadPage, StoreError> {
        tokio::task::yield_now().await;
        Ok(self.query(input))
    }

    async fn issue_scan(&self, input: &ScanInput) -> Result<ReadPage, StoreError> {
        tokio::task::yield_now().await;
        Ok(self.scan(input))
    }

    async fn issue_get(&self, input: &GetItemInput) -> Result<GetItemOutput, StoreError> {
        tokio::task::yield_now().await;
        Ok(self.get(input))
    }

    async fn issue_write(&self, request: &WriteRequest) -> Result<WriteOutput, StoreError> {
        self.write(request)
    }
}

/// Orders of one customer: `customer` (stored `pk`) and `seq` (stored `sk`).
#[must_use]
pub fn orders_schema() -> Schema {
    Schema::new("orders")
        .with_field(FieldSchema::string("customer").alias("pk").partition_key())
        .and_then(|s| s.with_field(FieldSchema::string("seq").alias("sk").sort_key()))
        .and_then(|s| s.with_field(FieldSchema::string("status").alias("st")))
        .and_then(|s| s.with_field(FieldSchema::number("total")))
        .and_then(|s| s.with_field(FieldSchema::new("shipping", ValueKind::Map)))
        .and_then(|s| s.with_field(FieldSchema::string("kind").alias("_t").discriminator()))
        .and_then(|s| s.with_field(FieldSchema::number("version").version()))
        .and_then(|s| s.with_index(IndexSchema::global("by_status", "status").with_sort_key("seq")))
        .and_then(|s| s.with_index(IndexSchema::local("by_total", "customer").with_sort_key("total")))
        .unwrap()
}

/// `n` stored order records for customer `c1`, `seq` zero-padded.
#[must_use]
pub fn order_records(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| {
            [
                ("pk".to_owned(), AttributeValue::from("c1")),
                ("sk".to_owned(), AttributeValue::from(format!("{i:03}"))),
                ("st".to_owned(), AttributeValue::from("open")),
                ("total".to_owned(), AttributeValue::from(i64::try_from(i).unwrap() * 10)),
                ("_t".to_owned(), AttributeValue::from("order")),
            ]
            .into_iter()
            .collect()
        })
        .collect()
}

/// The logical `seq` of every record.
#[must_use]
pub fn seqs(records: &[Item]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get("seq").and_then(AttributeValue::as_s).unwrap_or_default().to_owned())
        .collect()
}

mod test_async;
mod test_collection;
mod test_expressions;
mod test_locking;
mod test_pagination;
