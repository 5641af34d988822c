use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument};

use fleetport_domain::{
    AssignRemoteDeviceInput, CreateRemoteDeviceInput, DeviceCredentials, FetchCredentialsInput,
    FetchCustomerNameInput, FetchRemoteDevicesInput, RemoteDevice, RemotePlatform,
    RemotePlatformError, RemoteResult, UpdateCredentialsInput,
};

use crate::api::{
    CreatedDeviceResponse, CredentialsPayload, CredentialsResponse, CustomerResponse, DeviceInfo,
    DeviceWithCredentialsRequest, EntityRef, MqttBasicValue, NewDevice, PageData,
    UpdateCredentialsRequest,
};
use crate::config::RemotePlatformConfig;
use crate::token::AuthTokenCache;

const PAGE_SIZE: u32 = 100;

/// HTTP implementation of the RemotePlatform capability against a
/// ThingsBoard-compatible dashboard API.
pub struct ThingsboardPlatform {
    http: Client,
    base_url: String,
    device_profile_id: String,
    tokens: AuthTokenCache,
}

impl ThingsboardPlatform {
    pub fn new(config: RemotePlatformConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let tokens = AuthTokenCache::new(http.clone(), &config);
        Ok(Self {
            http,
            base_url: config.base_url,
            device_profile_id: config.device_profile_id,
            tokens,
        })
    }

    /// Converts a non-success response into an API error. A 401 also drops
    /// the cached token so the next call re-authenticates.
    async fn check(&self, response: Response) -> RemoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        let detail = response.text().await.unwrap_or_default();
        Err(RemotePlatformError::Api {
            status: status.as_u16(),
            detail,
        })
    }

    fn transport(e: reqwest::Error) -> RemotePlatformError {
        RemotePlatformError::Transport(e.to_string())
    }

    fn decode(e: reqwest::Error) -> RemotePlatformError {
        RemotePlatformError::Decode(e.to_string())
    }

    async fn fetch_device_page(&self, url: &str) -> RemoteResult<PageData<DeviceInfo>> {
        let token = self.tokens.token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(Self::transport)?;
        self.check(response)
            .await?
            .json::<PageData<DeviceInfo>>()
            .await
            .map_err(Self::decode)
    }

    /// Pages through a deviceInfos-style endpoint until the platform reports
    /// no further pages.
    async fn fetch_paged_devices(&self, path: &str) -> RemoteResult<Vec<RemoteDevice>> {
        let mut devices = Vec::new();
        let mut page = 0u32;
        loop {
            let url = format!(
                "{}{}?pageSize={}&page={}",
                self.base_url, path, PAGE_SIZE, page
            );
            let body = self.fetch_device_page(&url).await?;
            devices.extend(body.data.into_iter().map(|d| RemoteDevice {
                remote_device_id: d.id.id,
                name: d.name,
                customer_id: d.customer_id.map(|c| c.id),
            }));
            if !body.has_next {
                break;
            }
            page += 1;
        }
        debug!(count = devices.len(), "fetched remote devices");
        Ok(devices)
    }

    fn mqtt_basic_value(username: &str, password: &str) -> RemoteResult<String> {
        serde_json::to_string(&MqttBasicValue {
            client_id: "",
            user_name: username,
            password,
        })
        .map_err(|e| RemotePlatformError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemotePlatform for ThingsboardPlatform {
    #[instrument(skip(self, input), fields(device_name = %input.name))]
    async fn create_device(&self, input: CreateRemoteDeviceInput) -> RemoteResult<String> {
        let token = self.tokens.token().await?;
        let body = DeviceWithCredentialsRequest {
            device: NewDevice {
                name: &input.name,
                label: "",
                device_profile_id: EntityRef {
                    id: self.device_profile_id.clone(),
                    entity_type: "DEVICE_PROFILE".to_string(),
                },
            },
            credentials: CredentialsPayload {
                credentials_type: "MQTT_BASIC".to_string(),
                credentials_value: Self::mqtt_basic_value(
                    &input.credentials.username,
                    &input.credentials.password,
                )?,
            },
        };

        let response = self
            .http
            .post(format!("{}/api/device-with-credentials", self.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport)?;

        let created: CreatedDeviceResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(Self::decode)?;

        debug!(remote_device_id = %created.id.id, "created remote device");
        Ok(created.id.id)
    }

    #[instrument(skip(self, input), fields(remote_device_id = %input.remote_device_id, tenant_id = %input.tenant_id))]
    async fn assign_device(&self, input: AssignRemoteDeviceInput) -> RemoteResult<()> {
        let token = self.tokens.token().await?;
        let response = self
            .http
            .post(format!(
                "{}/api/customer/{}/device/{}",
                self.base_url, input.tenant_id, input.remote_device_id
            ))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(Self::transport)?;

        self.check(response).await?;
        debug!("assigned remote device to tenant");
        Ok(())
    }

    async fn fetch_devices(
        &self,
        input: FetchRemoteDevicesInput,
    ) -> RemoteResult<Vec<RemoteDevice>> {
        self.fetch_paged_devices(&format!("/api/customer/{}/deviceInfos", input.tenant_id))
            .await
    }

    async fn fetch_all_devices(&self) -> RemoteResult<Vec<RemoteDevice>> {
        self.fetch_paged_devices("/api/tenant/devices").await
    }

    async fn fetch_credentials(
        &self,
        input: FetchCredentialsInput,
    ) -> RemoteResult<DeviceCredentials> {
        let token = self.tokens.token().await?;
        let response = self
            .http
            .get(format!(
                "{}/api/device/{}/credentials",
                self.base_url, input.remote_device_id
            ))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(Self::transport)?;

        let body: CredentialsResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(Self::decode)?;

        Ok(DeviceCredentials {
            remote_device_id: input.remote_device_id,
            credentials_type: body.credentials_type,
            credentials_value: body.credentials_value,
        })
    }

    #[instrument(skip(self, input), fields(remote_device_id = %input.remote_device_id))]
    async fn update_credentials(&self, input: UpdateCredentialsInput) -> RemoteResult<()> {
        let token = self.tokens.token().await?;
        let body = UpdateCredentialsRequest {
            device_id: EntityRef {
                id: input.remote_device_id.clone(),
                entity_type: "DEVICE".to_string(),
            },
            credentials_type: "MQTT_BASIC".to_string(),
            credentials_value: Self::mqtt_basic_value(
                &input.credentials.username,
                &input.credentials.password,
            )?,
        };

        let response = self
            .http
            .post(format!("{}/api/device/credentials", self.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport)?;

        self.check(response).await?;
        debug!("updated remote device credentials");
        Ok(())
    }

    async fn fetch_customer_name(
        &self,
        input: FetchCustomerNameInput,
    ) -> RemoteResult<Option<String>> {
        let token = self.tokens.token().await?;
        let response = self
            .http
            .get(format!(
                "{}/api/customer/{}",
                self.base_url, input.customer_id
            ))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(Self::transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: CustomerResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(Self::decode)?;

        Ok(body.title)
    }
}
