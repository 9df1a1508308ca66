//! Query/scan specifications and the pagination engine.

pub mod iter;
pub mod paginator;
pub mod spec;
pub mod stream;

pub use iter::ResultIterator;
pub use paginator::{CompiledRead, Paginator, ReadRequest};
pub use spec::{QuerySpec, QuerySpecBuilder, ScanSpec, ScanSpecBuilder};
pub use stream::AsyncResultIterator;
