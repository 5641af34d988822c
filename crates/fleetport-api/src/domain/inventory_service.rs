use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};

use fleetport_domain::{
    DeviceCredentialInput, DeviceCredentials, DomainError, DomainResult, FetchCredentialsInput,
    FetchCustomerNameInput, FetchRemoteDevicesInput, LicenseBatch, LicenseLedger, RemoteDevice,
    RemotePlatform, UpdateCredentialsInput,
};

/// How many enrichment calls run against the remote platform at once.
const ENRICHMENT_CONCURRENCY: usize = 8;

/// Remote device descriptor enriched for the console pages.
#[derive(Debug, Clone)]
pub struct DeviceDetails {
    pub device: RemoteDevice,
    pub customer_name: Option<String>,
    pub credentials: Option<DeviceCredentials>,
}

/// License batch enriched with the tenant's remote display name.
#[derive(Debug, Clone)]
pub struct LicenseBatchDetails {
    pub batch: LicenseBatch,
    pub customer_name: Option<String>,
}

/// Console listings and credential rotation over the remote platform.
///
/// Enrichment is a bounded-concurrency fan-out: per-item lookups that fail
/// degrade that item to unenriched rather than failing the whole listing.
pub struct DeviceInventoryService {
    remote_platform: Arc<dyn RemotePlatform>,
    ledger: Arc<LicenseLedger>,
}

impl DeviceInventoryService {
    pub fn new(remote_platform: Arc<dyn RemotePlatform>, ledger: Arc<LicenseLedger>) -> Self {
        Self {
            remote_platform,
            ledger,
        }
    }

    /// Tenant-wide inventory for the admin console.
    #[instrument(skip(self))]
    pub async fn list_devices_with_details(&self) -> DomainResult<Vec<DeviceDetails>> {
        let devices = self
            .remote_platform
            .fetch_all_devices()
            .await
            .map_err(|e| DomainError::RemoteQueryFailed(e.to_string()))?;

        debug!(count = devices.len(), "enriching remote device listing");
        Ok(self.enrich_devices(devices).await)
    }

    /// One tenant's devices as the remote platform sees them, with
    /// credentials, for the customer device page.
    #[instrument(skip(self, tenant_id), fields(tenant_id = %tenant_id))]
    pub async fn list_tenant_devices(&self, tenant_id: String) -> DomainResult<Vec<DeviceDetails>> {
        let devices = self
            .remote_platform
            .fetch_devices(FetchRemoteDevicesInput { tenant_id })
            .await
            .map_err(|e| DomainError::RemoteQueryFailed(e.to_string()))?;

        Ok(self.enrich_devices(devices).await)
    }

    /// Replace a device's MQTT credentials on the remote platform.
    #[instrument(skip(self, credentials), fields(remote_device_id = %remote_device_id))]
    pub async fn rotate_device_credentials(
        &self,
        remote_device_id: String,
        credentials: DeviceCredentialInput,
    ) -> DomainResult<()> {
        self.remote_platform
            .update_credentials(UpdateCredentialsInput {
                remote_device_id,
                credentials,
            })
            .await
            .map_err(|e| DomainError::RemoteQueryFailed(e.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_licenses_with_customer_names(
        &self,
    ) -> DomainResult<Vec<LicenseBatchDetails>> {
        let batches = self.ledger.list_all_batches().await?;

        let details = stream::iter(batches)
            .map(|batch| {
                let remote = self.remote_platform.clone();
                async move {
                    let customer_name = remote
                        .fetch_customer_name(FetchCustomerNameInput {
                            customer_id: batch.tenant_id.clone(),
                        })
                        .await
                        .unwrap_or_else(|e| {
                            warn!(error = %e, tenant_id = %batch.tenant_id, "customer lookup failed");
                            None
                        });

                    LicenseBatchDetails {
                        batch,
                        customer_name,
                    }
                }
            })
            .buffer_unordered(ENRICHMENT_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        Ok(details)
    }

    async fn enrich_devices(&self, devices: Vec<RemoteDevice>) -> Vec<DeviceDetails> {
        stream::iter(devices)
            .map(|device| {
                let remote = self.remote_platform.clone();
                async move {
                    let customer_name = match &device.customer_id {
                        Some(customer_id) => remote
                            .fetch_customer_name(FetchCustomerNameInput {
                                customer_id: customer_id.clone(),
                            })
                            .await
                            .unwrap_or_else(|e| {
                                warn!(error = %e, customer_id = %customer_id, "customer lookup failed");
                                None
                            }),
                        None => None,
                    };

                    let credentials = match remote
                        .fetch_credentials(FetchCredentialsInput {
                            remote_device_id: device.remote_device_id.clone(),
                        })
                        .await
                    {
                        Ok(credentials) => Some(credentials),
                        Err(e) => {
                            warn!(
                                error = %e,
                                remote_device_id = %device.remote_device_id,
                                "credentials lookup failed"
                            );
                            None
                        }
                    };

                    DeviceDetails {
                        device,
                        customer_name,
                        credentials,
                    }
                }
            })
            .buffer_unordered(ENRICHMENT_CONCURRENCY)
            .collect::<Vec<_>>()
            .await
    }
}
