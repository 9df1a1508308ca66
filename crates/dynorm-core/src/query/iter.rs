//! Blocking pagination driver.

use std::collections::VecDeque;
use std::marker::PhantomData;

use dynorm_model::{Item, PageCursor, ReadPage, StoreError};

use super::paginator::{CompiledRead, Paginator, ReadRequest};
use crate::decode::{Decode, decode_record};
use crate::error::OrmResult;
use crate::gateway::StorageGateway;
use crate::schema::Schema;

/// Lazily pages through a read, decoding records into `T`.
///
/// A round trip is issued only when the buffered page runs dry. After a
/// gateway error the iterator is finished; its cursor still points after the
/// last page that succeeded.
pub struct ResultIterator<'a, G: ?Sized, T> {
    gateway: &'a G,
    schema: &'a Schema,
    paginator: Paginator,
    buffer: VecDeque<Item>,
    mid_page: Option<PageCursor>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, G, T> ResultIterator<'a, G, T>
where
    G: StorageGateway + ?Sized,
    T: Decode,
{
    /// Drive `read` through `gateway`, decoding with `schema`.
    #[must_use]
    pub fn new(gateway: &'a G, schema: &'a Schema, read: CompiledRead) -> Self {
        Self {
            gateway,
            schema,
            paginator: Paginator::new(read),
            buffer: VecDeque::new(),
            mid_page: None,
            _marker: PhantomData,
        }
    }

    /// The next batch of records: whatever is still buffered, otherwise one
    /// fresh round trip. A page may be empty when the filter dropped every
    /// record. Returns `None` once pagination is over.
    pub fn next_page(&mut self) -> OrmResult<Option<Vec<T>>> {
        if self.buffer.is_empty() && !self.fetch()? {
            return Ok(None);
        }
        self.mid_page = None;
        self.buffer
            .drain(..)
            .map(|raw| decode_record(self.schema, raw))
            .collect::<OrmResult<Vec<_>>>()
            .map(Some)
    }

    /// Cursor to resume from, `None` once the store is exhausted.
    ///
    /// While part of a page is still buffered this is the key of the last
    /// record handed out, not the end of the page.
    #[must_use]
    pub fn last_evaluated_key(&self) -> Option<&PageCursor> {
        self.mid_page
            .as_ref()
            .or_else(|| self.paginator.last_evaluated_key())
    }

    /// Records yielded so far.
    #[must_use]
    pub fn items_yielded(&self) -> usize {
        self.paginator.items_yielded()
    }

    /// Round trips issued so far.
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.paginator.round_trips()
    }

    fn pop(&mut self) -> Option<Item> {
        let raw = self.buffer.pop_front()?;
        self.mid_page = (!self.buffer.is_empty()).then(|| self.paginator.cursor_after(&raw));
        Some(raw)
    }

    fn fetch(&mut self) -> OrmResult<bool> {
        let Some(request) = self.paginator.next_request() else {
            return Ok(false);
        };
        match issue(self.gateway, &request) {
            Ok(page) => {
                self.buffer.extend(self.paginator.accept(page));
                Ok(true)
            }
            Err(err) => {
                self.paginator.halt();
                Err(err.into())
            }
        }
    }
}

impl<G, T> Iterator for ResultIterator<'_, G, T>
where
    G: StorageGateway + ?Sized,
    T: Decode,
{
    type Item = OrmResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(raw) = self.pop() {
                return Some(decode_record(self.schema, raw));
            }
            match self.fetch() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<G: ?Sized, T> std::fmt::Debug for ResultIterator<'_, G, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultIterator")
            .field("paginator", &self.paginator)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

/// Sum record counts over every page of a count read.
pub fn count<G: StorageGateway + ?Sized>(gateway: &G, read: CompiledRead) -> OrmResult<u64> {
    let mut paginator = Paginator::new(read);
    let mut total = 0;
    while let Some(request) = paginator.next_request() {
        let page = issue(gateway, &request)?;
        total += paginator.accept_count(&page);
    }
    Ok(total)
}

fn issue<G: StorageGateway + ?Sized>(gateway: &G, request: &ReadRequest) -> Result<ReadPage, StoreError> {
    match request {
        ReadRequest::Query(input) => gateway.issue_query(input),
        ReadRequest::Scan(input) => gateway.issue_scan(input),
    }
}
