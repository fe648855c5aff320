//! The export flow itself: validate, authenticate, resolve, confirm, grant,
//! copy, revoke — in that order, stopping at the first failure.

use std::sync::Arc;

use log::info;

use crate::cloud::{
    BlobCopyApi, CopyOutcome, DiskAccessApi, MetadataApi, SessionApi, StorageKeysApi,
};
use crate::error::{ExportError, ExportResult};
use crate::prompt::Prompt;

/// Everything the operator specifies for one export run.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub resource_group: String,
    pub vm_name: String,
    pub storage_account: String,
    pub container: String,
    pub destination: String,
    pub sas_expiry_secs: u32,
    pub no_confirm: bool,
}

impl ExportRequest {
    /// Local validation, run before any network call is made.
    pub fn validate(&self) -> ExportResult<()> {
        if !is_vhd_name(&self.destination) {
            return Err(ExportError::InvalidDestination(self.destination.clone()));
        }
        if self.sas_expiry_secs == 0 {
            return Err(ExportError::InvalidExpiry);
        }
        Ok(())
    }
}

/// `.vhd` suffix check. Case-insensitive: `disk.VHD` is as acceptable a
/// destination as `disk.vhd`.
pub fn is_vhd_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".vhd")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Grant, copy and revoke all completed.
    Completed(CopyOutcome),
    /// The operator declined the confirmation prompt before anything was
    /// granted. Not an error.
    Cancelled,
}

/// Orchestrates one export run over the injected cloud interfaces.
pub struct Exporter {
    session: Arc<dyn SessionApi>,
    metadata: Arc<dyn MetadataApi>,
    disk_access: Arc<dyn DiskAccessApi>,
    storage_keys: Arc<dyn StorageKeysApi>,
    blob_copy: Arc<dyn BlobCopyApi>,
}

impl Exporter {
    pub fn new(
        session: Arc<dyn SessionApi>,
        metadata: Arc<dyn MetadataApi>,
        disk_access: Arc<dyn DiskAccessApi>,
        storage_keys: Arc<dyn StorageKeysApi>,
        blob_copy: Arc<dyn BlobCopyApi>,
    ) -> Self {
        Self {
            session,
            metadata,
            disk_access,
            storage_keys,
            blob_copy,
        }
    }

    /// Runs the flow end to end.
    ///
    /// A failed copy deliberately skips the revoke: the SAS stays valid
    /// until its natural expiry and must be revoked manually if that is not
    /// acceptable. Only a successful copy is followed by a revoke.
    pub async fn run(
        &self,
        request: &ExportRequest,
        prompt: &dyn Prompt,
    ) -> ExportResult<ExportOutcome> {
        request.validate()?;

        self.session.ensure_authenticated().await?;

        let location = self
            .metadata
            .resource_group_location(&request.resource_group)
            .await?;
        info!(
            "resource group {} is in {location}",
            request.resource_group
        );

        let os_disk = self
            .metadata
            .vm_os_disk_name(&request.resource_group, &request.vm_name)
            .await?;
        info!("OS disk of {} is {os_disk}", request.vm_name);

        if !request.no_confirm {
            let plan = render_plan(request, &location, &os_disk);
            if !prompt.confirm(&plan)? {
                info!("export cancelled by the operator");
                return Ok(ExportOutcome::Cancelled);
            }
        }

        let access_key = self
            .storage_keys
            .primary_access_key(&request.resource_group, &request.storage_account)
            .await?;

        let sas_url = self
            .disk_access
            .grant_read_access(&request.resource_group, &os_disk, request.sas_expiry_secs)
            .await?;
        info!(
            "read access granted on {os_disk} for {} seconds",
            request.sas_expiry_secs
        );

        let outcome = self
            .blob_copy
            .copy_from_url(
                &sas_url,
                &request.storage_account,
                &access_key,
                &request.container,
                &request.destination,
            )
            .await?;
        info!(
            "copied {} bytes in {:.1?}",
            outcome.bytes_copied, outcome.elapsed
        );

        self.disk_access
            .revoke_access(&request.resource_group, &os_disk)
            .await?;
        info!("read access on {os_disk} revoked");

        Ok(ExportOutcome::Completed(outcome))
    }
}

fn render_plan(request: &ExportRequest, location: &str, os_disk: &str) -> String {
    format!(
        "About to copy the OS disk of VM `{}` (resource group `{}`, {location}):\n  \
         disk:        {os_disk}\n  \
         destination: {}/{}/{}\n\
         Proceed?",
        request.vm_name, request.resource_group, request.storage_account, request.container,
        request.destination
    )
}
