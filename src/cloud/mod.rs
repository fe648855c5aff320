//! Narrow interfaces over the cloud APIs the export flow talks to.
//!
//! Each trait covers exactly one request/response boundary: the identity
//! check, the two management-plane lookups, the disk access grant/revoke
//! pair, the storage key fetch and the blob copy. The real implementations
//! live in [`arm`] and [`blob`]; tests substitute in-memory fakes.

pub mod arm;
pub mod blob;

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::ExportResult;

/// What a finished copy reports back: how much landed and how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    pub bytes_copied: u64,
    pub elapsed: Duration,
}

#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Verifies that an authenticated session exists by acquiring a
    /// management-plane token. Fatal if no credential source works.
    async fn ensure_authenticated(&self) -> ExportResult<()>;
}

/// Read-only management-plane lookups.
#[async_trait]
pub trait MetadataApi: Send + Sync {
    async fn resource_group_location(&self, resource_group: &str) -> ExportResult<String>;

    /// Resolves the name of the managed disk the VM boots from.
    async fn vm_os_disk_name(&self, resource_group: &str, vm_name: &str) -> ExportResult<String>;
}

/// Grant and revoke of the temporary read SAS on a managed disk.
///
/// The grant produces a URL embedding the SAS token. Revoke is only ever
/// called after a successful copy; on any earlier failure the token is left
/// to expire naturally.
#[async_trait]
pub trait DiskAccessApi: Send + Sync {
    async fn grant_read_access(
        &self,
        resource_group: &str,
        disk_name: &str,
        duration_secs: u32,
    ) -> ExportResult<Url>;

    async fn revoke_access(&self, resource_group: &str, disk_name: &str) -> ExportResult<()>;
}

#[async_trait]
pub trait StorageKeysApi: Send + Sync {
    /// Fetches the first access key of the storage account. The caller must
    /// not persist or log the value.
    async fn primary_access_key(
        &self,
        resource_group: &str,
        account: &str,
    ) -> ExportResult<String>;
}

#[async_trait]
pub trait BlobCopyApi: Send + Sync {
    /// Copies the SAS-addressed source into `container/blob_name`,
    /// overwriting any existing blob, and blocks until the copy reaches a
    /// terminal state.
    async fn copy_from_url(
        &self,
        source: &Url,
        account: &str,
        access_key: &str,
        container: &str,
        blob_name: &str,
    ) -> ExportResult<CopyOutcome>;
}
