//! Azure Resource Manager client for the management-plane calls: resource
//! group and VM lookups, disk access grant/revoke and the storage key fetch.
//!
//! Requests are plain ARM REST calls authorized with a bearer token from the
//! injected [`TokenCredential`]. The disk access operations are long-running:
//! a `202 Accepted` is followed by polling its `Location` header (honoring
//! `Retry-After`) until the service reports a terminal response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use log::debug;
use reqwest::header::{CONTENT_LENGTH, LOCATION, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{DiskAccessApi, MetadataApi, SessionApi, StorageKeysApi};
use crate::error::{ExportError, ExportResult};

const ARM_ENDPOINT: &str = "https://management.azure.com";
const ARM_SCOPE: &str = "https://management.azure.com/.default";

const RESOURCES_API_VERSION: &str = "2021-04-01";
const COMPUTE_API_VERSION: &str = "2022-08-01";
const DISK_API_VERSION: &str = "2022-07-02";
const STORAGE_API_VERSION: &str = "2022-09-01";

/// Wait between polls of a pending operation when the service does not send
/// `Retry-After`.
const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(2);

/// Authenticated client for the Azure management plane.
pub struct ArmClient {
    http: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    subscription_id: String,
    endpoint: Url,
}

impl ArmClient {
    pub fn new(
        credential: Arc<dyn TokenCredential>,
        subscription_id: impl Into<String>,
    ) -> ExportResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            credential,
            subscription_id: subscription_id.into(),
            endpoint: Url::parse(ARM_ENDPOINT)?,
        })
    }

    async fn bearer_token(&self) -> ExportResult<String> {
        let token = self.credential.get_token(&[ARM_SCOPE]).await?;
        Ok(token.token.secret().to_owned())
    }

    fn resource_url(&self, path: &str, api_version: &str) -> ExportResult<Url> {
        let mut url = self.endpoint.join(path)?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    async fn get_json<T>(&self, operation: &'static str, url: Url) -> ExportResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let token = self.bearer_token().await?;
        let response = self.http.get(url).bearer_auth(&token).send().await?;
        let response = check_status(operation, response).await?;
        Ok(response.json().await?)
    }

    /// POST that may complete asynchronously. Returns the body of the
    /// terminal response, if any.
    async fn post_lro(
        &self,
        operation: &'static str,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> ExportResult<Option<serde_json::Value>> {
        let token = self.bearer_token().await?;
        let request = match body {
            Some(ref body) => self.http.post(url).bearer_auth(&token).json(body),
            None => self
                .http
                .post(url)
                .bearer_auth(&token)
                .header(CONTENT_LENGTH, 0),
        };
        let mut response = check_status(operation, request.send().await?).await?;

        if response.status() == StatusCode::ACCEPTED {
            let poll_url = poll_target(operation, &response)?;
            loop {
                let delay = retry_after(&response).unwrap_or(DEFAULT_POLL_DELAY);
                debug!("{operation} still pending, polling again in {delay:?}");
                tokio::time::sleep(delay).await;

                let token = self.bearer_token().await?;
                let poll = self
                    .http
                    .get(poll_url.clone())
                    .bearer_auth(&token)
                    .send()
                    .await?;
                response = check_status(operation, poll).await?;
                if response.status() != StatusCode::ACCEPTED {
                    break;
                }
            }
        }

        let text = response.text().await?;
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(serde_json::from_str(&text)?))
        }
    }
}

async fn check_status(operation: &'static str, response: Response) -> ExportResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ExportError::Management {
            operation,
            status,
            body,
        })
    }
}

fn poll_target(operation: &'static str, response: &Response) -> ExportResult<Url> {
    let raw = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ExportError::MalformedResponse {
            operation,
            detail: "202 response without a Location header".into(),
        })?;
    Ok(Url::parse(raw)?)
}

fn retry_after(response: &Response) -> Option<Duration> {
    let seconds = response.headers().get(RETRY_AFTER)?.to_str().ok()?;
    seconds.parse::<u64>().ok().map(Duration::from_secs)
}

#[derive(Debug, Deserialize)]
struct ResourceGroup {
    location: String,
}

#[derive(Debug, Deserialize)]
struct VirtualMachine {
    properties: Option<VirtualMachineProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VirtualMachineProperties {
    storage_profile: Option<StorageProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageProfile {
    os_disk: Option<OsDisk>,
}

#[derive(Debug, Deserialize)]
struct OsDisk {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessUri {
    #[serde(rename = "accessSAS")]
    access_sas: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageAccountKeys {
    #[serde(default)]
    keys: Vec<StorageAccountKey>,
}

#[derive(Debug, Deserialize)]
struct StorageAccountKey {
    value: String,
}

#[async_trait]
impl SessionApi for ArmClient {
    async fn ensure_authenticated(&self) -> ExportResult<()> {
        self.credential
            .get_token(&[ARM_SCOPE])
            .await
            .map(drop)
            .map_err(ExportError::Unauthenticated)
    }
}

#[async_trait]
impl MetadataApi for ArmClient {
    async fn resource_group_location(&self, resource_group: &str) -> ExportResult<String> {
        let url = self.resource_url(
            &format!(
                "/subscriptions/{}/resourcegroups/{}",
                self.subscription_id, resource_group
            ),
            RESOURCES_API_VERSION,
        )?;
        let group: ResourceGroup = self.get_json("resource group lookup", url).await?;
        Ok(group.location)
    }

    async fn vm_os_disk_name(&self, resource_group: &str, vm_name: &str) -> ExportResult<String> {
        let url = self.resource_url(
            &format!(
                "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachines/{}",
                self.subscription_id, resource_group, vm_name
            ),
            COMPUTE_API_VERSION,
        )?;
        let vm: VirtualMachine = self.get_json("virtual machine lookup", url).await?;
        vm.properties
            .and_then(|properties| properties.storage_profile)
            .and_then(|profile| profile.os_disk)
            .and_then(|disk| disk.name)
            .ok_or_else(|| ExportError::MalformedResponse {
                operation: "virtual machine lookup",
                detail: "no OS disk name in the storage profile".into(),
            })
    }
}

#[async_trait]
impl DiskAccessApi for ArmClient {
    async fn grant_read_access(
        &self,
        resource_group: &str,
        disk_name: &str,
        duration_secs: u32,
    ) -> ExportResult<Url> {
        let url = self.resource_url(
            &format!(
                "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/disks/{}/beginGetAccess",
                self.subscription_id, resource_group, disk_name
            ),
            DISK_API_VERSION,
        )?;
        let body = serde_json::json!({
            "access": "Read",
            "durationInSeconds": duration_secs,
        });
        let value = self
            .post_lro("disk access grant", url, Some(body))
            .await?
            .ok_or_else(|| ExportError::MalformedResponse {
                operation: "disk access grant",
                detail: "grant completed without a response body".into(),
            })?;
        let access: AccessUri = serde_json::from_value(value)?;
        let sas = access.access_sas.ok_or_else(|| ExportError::MalformedResponse {
            operation: "disk access grant",
            detail: "grant response carried no accessSAS".into(),
        })?;
        Ok(Url::parse(&sas)?)
    }

    async fn revoke_access(&self, resource_group: &str, disk_name: &str) -> ExportResult<()> {
        let url = self.resource_url(
            &format!(
                "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/disks/{}/endGetAccess",
                self.subscription_id, resource_group, disk_name
            ),
            DISK_API_VERSION,
        )?;
        self.post_lro("disk access revoke", url, None).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageKeysApi for ArmClient {
    async fn primary_access_key(
        &self,
        resource_group: &str,
        account: &str,
    ) -> ExportResult<String> {
        let url = self.resource_url(
            &format!(
                "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}/listKeys",
                self.subscription_id, resource_group, account
            ),
            STORAGE_API_VERSION,
        )?;
        let token = self.bearer_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .header(CONTENT_LENGTH, 0)
            .send()
            .await?;
        let response = check_status("storage key fetch", response).await?;
        let listed: StorageAccountKeys = response.json().await?;
        debug!("storage account key retrieved (value withheld from output)");
        listed
            .keys
            .into_iter()
            .next()
            .map(|key| key.value)
            .ok_or_else(|| ExportError::MalformedResponse {
                operation: "storage key fetch",
                detail: "account returned no keys".into(),
            })
    }
}
