//! Destination-side copy executor built on `azure_storage_blobs`.
//!
//! The copy is server side: the storage service pulls from the SAS-addressed
//! source, so no disk bytes flow through this process. The service keeps the
//! blob's copy status on the destination, which is polled until it leaves
//! `pending`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use azure_storage::prelude::*;
use azure_storage_blobs::blob::*;
use azure_storage_blobs::prelude::*;
use log::debug;
use url::Url;

use super::{BlobCopyApi, CopyOutcome};
use crate::error::{ExportError, ExportResult};

/// Wait between copy-progress polls on the destination blob.
const COPY_POLL_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default)]
pub struct BlobCopier;

#[async_trait]
impl BlobCopyApi for BlobCopier {
    async fn copy_from_url(
        &self,
        source: &Url,
        account: &str,
        access_key: &str,
        container: &str,
        blob_name: &str,
    ) -> ExportResult<CopyOutcome> {
        let credentials = StorageCredentials::access_key(account.to_owned(), access_key.to_owned());
        let blob_client = BlobServiceClient::builder(account, credentials)
            .container_client(container)
            .blob_client(blob_name);

        let started = Instant::now();
        let response = blob_client.copy(source.clone()).await?;
        let mut status = response.copy_status;

        loop {
            match status {
                CopyStatus::Success => break,
                CopyStatus::Pending => {
                    debug!("copy pending on {container}/{blob_name}, polling");
                    tokio::time::sleep(COPY_POLL_DELAY).await;
                    let properties = blob_client.get_properties().await?;
                    status = polled_status(properties.blob.properties.copy_status)?;
                }
                CopyStatus::Aborted => {
                    return Err(ExportError::CopyFailed("the copy was aborted".into()))
                }
                CopyStatus::Failed => {
                    return Err(ExportError::CopyFailed(
                        "the service reported a failed copy".into(),
                    ))
                }
            }
        }

        let properties = blob_client.get_properties().await?;
        Ok(CopyOutcome {
            bytes_copied: properties.blob.properties.content_length,
            elapsed: started.elapsed(),
        })
    }
}

/// A blob in mid-copy must carry a copy status; its absence means the
/// destination is not the blob the copy was started on.
fn polled_status(status: Option<CopyStatus>) -> ExportResult<CopyStatus> {
    status.ok_or_else(|| ExportError::MalformedResponse {
        operation: "blob copy",
        detail: "destination blob reports no copy status".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_poll_without_a_copy_status_is_an_error() {
        let error = polled_status(None).unwrap_err();
        assert!(matches!(
            error,
            ExportError::MalformedResponse { operation, .. } if operation == "blob copy"
        ));
    }

    #[test]
    fn a_reported_status_is_passed_through() {
        assert!(matches!(
            polled_status(Some(CopyStatus::Pending)),
            Ok(CopyStatus::Pending)
        ));
    }
}
