//! Storage gateway seam.
//!
//! The gateway is the only component that talks to the store. It receives
//! fully compiled artifacts and returns raw pages; it never sees condition
//! or update trees. Errors are returned as [`StoreError`] and reach the
//! caller unchanged.

use std::sync::Arc;

use dynorm_model::{
    GetItemInput, GetItemOutput, QueryInput, ReadPage, ScanInput, StoreError, WriteOutput,
    WriteRequest,
};

/// Blocking gateway.
pub trait StorageGateway {
    /// Execute one query round trip.
    fn issue_query(&self, input: &QueryInput) -> Result<ReadPage, StoreError>;

    /// Execute one scan round trip.
    fn issue_scan(&self, input: &ScanInput) -> Result<ReadPage, StoreError>;

    /// Fetch one record by primary key.
    fn issue_get(&self, input: &GetItemInput) -> Result<GetItemOutput, StoreError>;

    /// Execute one single-record write.
    fn issue_write(&self, request: &WriteRequest) -> Result<WriteOutput, StoreError>;
}

/// Suspending gateway.
#[async_trait::async_trait]
pub trait AsyncStorageGateway: Send + Sync {
    /// Execute one query round trip.
    async fn issue_query(&self, input: &QueryInput) -> Result<ReadPage, StoreError>;

    /// Execute one scan round trip.
    async fn issue_scan(&self, input: &ScanInput) -> Result<ReadPage, StoreError>;

    /// Fetch one record by primary key.
    async fn issue_get(&self, input: &GetItemInput) -> Result<GetItemOutput, StoreError>;

    /// Execute one single-record write.
    async fn issue_write(&self, request: &WriteRequest) -> Result<WriteOutput, StoreError>;
}

impl<G: StorageGateway + ?Sized> StorageGateway for &G {
    fn issue_query(&self, input: &QueryInput) -> Result<ReadPage, StoreError> {
        (**self).issue_query(input)
    }

    fn issue_scan(&self, input: &ScanInput) -> Result<ReadPage, StoreError> {
        (**self).issue_scan(input)
    }

    fn issue_get(&self, input: &GetItemInput) -> Result<GetItemOutput, StoreError> {
        (**self).issue_get(input)
    }

    fn issue_write(&self, request: &WriteRequest) -> Result<WriteOutput, StoreError> {
        (**self).issue_write(request)
    }
}

impl<G: StorageGateway + ?Sized> StorageGateway for Arc<G> {
    fn issue_query(&self, input: &QueryInput) -> Result<ReadPage, StoreError> {
        (**self).issue_query(input)
    }

    fn issue_scan(&self, input: &ScanInput) -> Result<ReadPage, StoreError> {
        (**self).issue_scan(input)
    }

    fn issue_get(&self, input: &GetItemInput) -> Result<GetItemOutput, StoreError> {
        (**self).issue_get(input)
    }

    fn issue_write(&self, request: &WriteRequest) -> Result<WriteOutput, StoreError> {
        (**self).issue_write(request)
    }
}

#[async_trait::async_trait]
impl<G: AsyncStorageGateway + ?Sized> AsyncStorageGateway for Arc<G> {
    async fn issue_query(&self, input: &QueryInput) -> Result<ReadPage, StoreError> {
        (**self).issue_query(input).await
    }

    async fn issue_scan(&self, input: &ScanInput) -> Result<ReadPage, StoreError> {
        (**self).issue_scan(input).await
    }

    async fn issue_get(&self, input: &GetItemInput) -> Result<GetItemOutput, StoreError> {
        (**self).issue_get(input).await
    }

    async fn issue_write(&self, request: &WriteRequest) -> Result<WriteOutput, StoreError> {
        (**self).issue_write(request).await
    }
}
