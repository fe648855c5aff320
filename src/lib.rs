//! Copy an Azure virtual machine's OS disk into a storage account as a VHD
//! blob, authorized by a temporary read-only Shared Access Signature.
//!
//! The flow is strictly linear: resolve metadata about the VM, ask the
//! operator to confirm, fetch the destination account key, grant a
//! time-limited read SAS on the OS disk, run a server-side blob copy and
//! finally revoke the SAS. Every failure is fatal and nothing is retried;
//! if the copy itself fails the SAS is left to expire on its own.
//!
//! The cloud APIs are kept behind narrow traits (see [`cloud`]) so the whole
//! flow can be exercised against in-memory fakes without a network.

pub mod cli;
pub mod cloud;
pub mod error;
pub mod export;
pub mod prompt;

pub use error::{ExportError, ExportResult};
pub use export::{ExportOutcome, ExportRequest, Exporter};
