//! Pagination state machine shared by the blocking and async drivers.
//!
//! The paginator decides what the next round trip looks like and digests each
//! page; it never performs I/O itself. Drivers call [`Paginator::next_request`],
//! hand the request to a gateway, and feed the page back through
//! [`Paginator::accept`].

use dynorm_model::{Item, PageCursor, QueryInput, ReadPage, ScanInput};
use tracing::debug;

/// A compiled read request, ready for the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadRequest {
    /// Key-condition read.
    Query(QueryInput),
    /// Full table or index read.
    Scan(ScanInput),
}

impl ReadRequest {
    /// Target table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::Query(input) => &input.table_name,
            Self::Scan(input) => &input.table_name,
        }
    }

    /// Target index name, if any.
    #[must_use]
    pub fn index_name(&self) -> Option<&str> {
        match self {
            Self::Query(input) => input.index_name.as_deref(),
            Self::Scan(input) => input.index_name.as_deref(),
        }
    }

    /// Records requested per round trip.
    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        match self {
            Self::Query(input) => input.limit,
            Self::Scan(input) => input.limit,
        }
    }

    /// The continuation cursor the request starts from.
    #[must_use]
    pub fn exclusive_start_key(&self) -> Option<&PageCursor> {
        match self {
            Self::Query(input) => input.exclusive_start_key.as_ref(),
            Self::Scan(input) => input.exclusive_start_key.as_ref(),
        }
    }

    fn set_exclusive_start_key(&mut self, cursor: Option<PageCursor>) {
        match self {
            Self::Query(input) => input.exclusive_start_key = cursor,
            Self::Scan(input) => input.exclusive_start_key = cursor,
        }
    }
}

/// A read request together with the bounds the paginator enforces.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRead {
    /// Template for every round trip; the start key is the resume cursor.
    pub request: ReadRequest,
    /// Maximum records yielded overall.
    pub total_limit: Option<usize>,
    /// Stored names that make up a continuation key for this target.
    pub cursor_attributes: Vec<String>,
}

/// Round-trip bookkeeping for one read.
#[derive(Debug)]
pub struct Paginator {
    request: ReadRequest,
    total_limit: Option<usize>,
    cursor_attributes: Vec<String>,
    items_yielded: usize,
    round_trips: usize,
    current_cursor: Option<PageCursor>,
    exhausted: bool,
}

impl Paginator {
    /// Start paginating `read`, resuming from its start key if present.
    #[must_use]
    pub fn new(read: CompiledRead) -> Self {
        let CompiledRead {
            request,
            total_limit,
            cursor_attributes,
        } = read;
        Self {
            current_cursor: request.exclusive_start_key().cloned(),
            exhausted: total_limit == Some(0),
            request,
            total_limit,
            cursor_attributes,
            items_yielded: 0,
            round_trips: 0,
        }
    }

    /// The next round trip to issue, or `None` when pagination is over.
    #[must_use]
    pub fn next_request(&self) -> Option<ReadRequest> {
        if self.exhausted {
            return None;
        }
        let mut request = self.request.clone();
        request.set_exclusive_start_key(self.current_cursor.clone());
        Some(request)
    }

    /// Digest one page, returning the records to yield.
    ///
    /// When the total limit falls inside the page, the surplus is dropped and
    /// the exposed cursor becomes the key of the last kept record, so resuming
    /// continues right after it.
    pub fn accept(&mut self, page: ReadPage) -> Vec<Item> {
        let ReadPage {
            mut items,
            last_evaluated_key,
            ..
        } = page;
        self.round_trips += 1;
        debug!(
            table = %self.request.table_name(),
            index = ?self.request.index_name(),
            limit = ?self.request.limit(),
            returned = items.len(),
            has_cursor = last_evaluated_key.is_some(),
            "read round trip"
        );

        if let Some(limit) = self.total_limit {
            let remaining = limit.saturating_sub(self.items_yielded);
            if items.len() >= remaining {
                let truncated = items.len() > remaining;
                items.truncate(remaining);
                self.current_cursor = if truncated {
                    items.last().map(|last| self.cursor_after(last))
                } else {
                    last_evaluated_key
                };
                self.items_yielded += items.len();
                self.exhausted = true;
                debug!(
                    limit,
                    round_trips = self.round_trips,
                    "total limit reached, stopping pagination"
                );
                return items;
            }
        }

        self.items_yielded += items.len();
        self.exhausted = last_evaluated_key.is_none();
        self.current_cursor = last_evaluated_key;
        items
    }

    /// Digest one page of a count read, returning its record count.
    pub fn accept_count(&mut self, page: &ReadPage) -> u64 {
        self.round_trips += 1;
        debug!(
            table = %self.request.table_name(),
            count = page.count,
            has_cursor = page.last_evaluated_key.is_some(),
            "count round trip"
        );
        self.exhausted = page.last_evaluated_key.is_none();
        self.current_cursor.clone_from(&page.last_evaluated_key);
        u64::from(page.count)
    }

    /// Stop after a failed round trip. The cursor stays at the last good page.
    pub fn halt(&mut self) {
        self.exhausted = true;
    }

    /// Cursor to resume from, `None` once the store is exhausted.
    #[must_use]
    pub fn last_evaluated_key(&self) -> Option<&PageCursor> {
        self.current_cursor.as_ref()
    }

    /// Records yielded so far.
    #[must_use]
    pub fn items_yielded(&self) -> usize {
        self.items_yielded
    }

    /// Round trips issued so far.
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Whether no further round trips will be issued.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Cursor resuming right after `item`, a raw record of this read.
    #[must_use]
    pub fn cursor_after(&self, item: &Item) -> PageCursor {
        let key = self
            .cursor_attributes
            .iter()
            .filter_map(|name| item.get(name).map(|v| (name.clone(), v.clone())))
            .collect();
        PageCursor::new(key)
    }
}
