//! Async pagination driver.

use std::collections::VecDeque;
use std::marker::PhantomData;

use dynorm_model::{Item, PageCursor, ReadPage, StoreError};
use futures::Stream;

use super::paginator::{CompiledRead, Paginator, ReadRequest};
use crate::decode::{Decode, decode_record};
use crate::error::{OrmError, OrmResult};
use crate::gateway::AsyncStorageGateway;
use crate::schema::Schema;

/// Async counterpart of [`ResultIterator`](super::ResultIterator), driven by
/// the same paginator.
pub struct AsyncResultIterator<'a, G: ?Sized, T> {
    gateway: &'a G,
    schema: &'a Schema,
    paginator: Paginator,
    buffer: VecDeque<Item>,
    mid_page: Option<PageCursor>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, G, T> AsyncResultIterator<'a, G, T>
where
    G: AsyncStorageGateway + ?Sized,
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

    /// The next record, suspending on a round trip when the buffer is empty.
    pub async fn try_next(&mut self) -> OrmResult<Option<T>> {
        loop {
            if let Some(raw) = self.pop() {
                return decode_record(self.schema, raw).map(Some);
            }
            if !self.fetch().await? {
                return Ok(None);
            }
        }
    }

    /// The next batch of records; see [`ResultIterator::next_page`](super::ResultIterator::next_page).
    pub async fn next_page(&mut self) -> OrmResult<Option<Vec<T>>> {
        if self.buffer.is_empty() && !self.fetch().await? {
            return Ok(None);
        }
        self.mid_page = None;
        self.buffer
            .drain(..)
            .map(|raw| decode_record(self.schema, raw))
            .collect::<OrmResult<Vec<_>>>()
            .map(Some)
    }

    /// Drain every remaining record.
    pub async fn try_collect(mut self) -> OrmResult<Vec<T>> {
        let mut records = Vec::new();
        while let Some(record) = self.try_next().await? {
            records.push(record);
        }
        Ok(records)
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

    /// Round trips issued so far.
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.paginator.round_trips()
    }

    /// Adapt into a [`Stream`] of records.
    pub fn into_stream(self) -> impl Stream<Item = OrmResult<T>> + 'a
    where
        T: 'a,
    {
        futures::stream::try_unfold(self, |mut iter| async move {
            let next = iter.try_next().await?;
            Ok::<_, OrmError>(next.map(|record| (record, iter)))
        })
    }

    fn pop(&mut self) -> Option<Item> {
        let raw = self.buffer.pop_front()?;
        self.mid_page = (!self.buffer.is_empty()).then(|| self.paginator.cursor_after(&raw));
        Some(raw)
    }

    async fn fetch(&mut self) -> OrmResult<bool> {
        let Some(request) = self.paginator.next_request() else {
            return Ok(false);
        };
        match issue(self.gateway, &request).await {
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

impl<G: ?Sized, T> std::fmt::Debug for AsyncResultIterator<'_, G, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncResultIterator")
            .field("paginator", &self.paginator)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

/// Sum record counts over every page of a count read.
pub async fn count<G: AsyncStorageGateway + ?Sized>(gateway: &G, read: CompiledRead) -> OrmResult<u64> {
    let mut paginator = Paginator::new(read);
    let mut total = 0;
    while let Some(request) = paginator.next_request() {
        let page = issue(gateway, &request).await?;
        total += paginator.accept_count(&page);
    }
    Ok(total)
}

async fn issue<G: AsyncStorageGateway + ?Sized>(
    gateway: &G,
    request: &ReadRequest,
) -> Result<ReadPage, StoreError> {
    match request {
        ReadRequest::Query(input) => gateway.issue_query(input).await,
        ReadRequest::Scan(input) => gateway.issue_scan(input).await,
    }
}
